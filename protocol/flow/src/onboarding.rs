use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::sleep;
use tracing::info;

use crate::error::FlowError;
use crate::stage::Stage;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OnboardingStep {
    Welcome,
    Wallet,
    Keys,
}

impl Stage for OnboardingStep {
    const ORDER: &'static [Self] = &[
        OnboardingStep::Welcome,
        OnboardingStep::Wallet,
        OnboardingStep::Keys,
    ];

    fn label(self) -> &'static str {
        match self {
            OnboardingStep::Welcome => "welcome",
            OnboardingStep::Wallet => "wallet",
            OnboardingStep::Keys => "keys",
        }
    }
}

/// Screen-level navigation: welcome, wallet connection, key generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnboardingNavigator {
    step: OnboardingStep,
    finished: bool,
}

impl Default for OnboardingNavigator {
    fn default() -> Self {
        Self::new()
    }
}

impl OnboardingNavigator {
    pub fn new() -> Self {
        Self {
            step: OnboardingStep::Welcome,
            finished: false,
        }
    }

    pub fn step(&self) -> OnboardingStep {
        self.step
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn get_started(&mut self) -> Result<OnboardingStep, FlowError> {
        self.require(OnboardingStep::Welcome, "get started")?;
        self.step = OnboardingStep::Wallet;
        Ok(self.step)
    }

    pub fn wallet_connected(&mut self) -> Result<OnboardingStep, FlowError> {
        self.require(OnboardingStep::Wallet, "finish wallet connection")?;
        self.step = OnboardingStep::Keys;
        Ok(self.step)
    }

    pub fn keys_generated(&mut self) -> Result<(), FlowError> {
        self.require(OnboardingStep::Keys, "finish key generation")?;
        self.finished = true;
        Ok(())
    }

    pub fn skip(&mut self) {
        self.finished = true;
    }

    /// One screen back; the welcome screen has nowhere to go.
    pub fn back(&mut self) -> OnboardingStep {
        self.step = match self.step {
            OnboardingStep::Keys => OnboardingStep::Wallet,
            OnboardingStep::Wallet | OnboardingStep::Welcome => OnboardingStep::Welcome,
        };
        self.step
    }

    fn require(&self, step: OnboardingStep, event: &'static str) -> Result<(), FlowError> {
        if self.finished || self.step != step {
            return Err(FlowError::UnexpectedEvent {
                event,
                step: self.step.label(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct KycForm {
    pub full_name: String,
    pub aadhaar_number: String,
    pub pan_number: String,
    pub phone_number: String,
}

/// Per-field validation messages; `None` means the field is fine.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct KycErrors {
    pub full_name: Option<&'static str>,
    pub aadhaar_number: Option<&'static str>,
    pub pan_number: Option<&'static str>,
    pub phone_number: Option<&'static str>,
}

impl KycErrors {
    pub fn is_empty(&self) -> bool {
        self.messages().next().is_none()
    }

    pub fn messages(&self) -> impl Iterator<Item = &'static str> + '_ {
        [
            self.full_name,
            self.aadhaar_number,
            self.pan_number,
            self.phone_number,
        ]
        .into_iter()
        .flatten()
    }
}

impl fmt::Display for KycErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<_> = self.messages().collect();
        f.write_str(&messages.join("; "))
    }
}

impl KycForm {
    pub fn validate(&self) -> Result<(), KycErrors> {
        let mut errors = KycErrors::default();
        if self.full_name.trim().is_empty() {
            errors.full_name = Some("Full name is required");
        }
        let aadhaar: String = self.aadhaar_number.split_whitespace().collect();
        if aadhaar.len() != 12 || !aadhaar.chars().all(|c| c.is_ascii_digit()) {
            errors.aadhaar_number = Some("Valid 12-digit Aadhaar number required");
        }
        if !is_valid_pan(&self.pan_number.to_ascii_uppercase()) {
            errors.pan_number = Some("Valid PAN number required (e.g., ABCDE1234F)");
        }
        if !is_valid_indian_mobile(&self.phone_number) {
            errors.phone_number = Some("Valid 10-digit Indian mobile number required");
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Copy safe to keep around: only the last four Aadhaar digits and PAN
    /// characters stay readable.
    pub fn masked(&self) -> KycForm {
        KycForm {
            full_name: self.full_name.clone(),
            aadhaar_number: mask_all_but_last(&self.aadhaar_number, 4, |c| c.is_ascii_digit()),
            pan_number: mask_all_but_last(&self.pan_number, 4, |c| c.is_alphanumeric()),
            phone_number: self.phone_number.clone(),
        }
    }
}

/// `AAAAA9999A`.
fn is_valid_pan(pan: &str) -> bool {
    let bytes = pan.as_bytes();
    bytes.len() == 10
        && bytes[..5].iter().all(u8::is_ascii_uppercase)
        && bytes[5..9].iter().all(u8::is_ascii_digit)
        && bytes[9].is_ascii_uppercase()
}

/// Ten digits starting with 6-9.
fn is_valid_indian_mobile(phone: &str) -> bool {
    let bytes = phone.as_bytes();
    bytes.len() == 10
        && matches!(bytes[0], b'6'..=b'9')
        && bytes.iter().all(u8::is_ascii_digit)
}

/// Replaces every matching character followed by at least `keep` more
/// matching characters with `X`.
fn mask_all_but_last(value: &str, keep: usize, matches: impl Fn(char) -> bool) -> String {
    let total = value.chars().filter(|c| matches(*c)).count();
    let mut seen = 0;
    value
        .chars()
        .map(|c| {
            if !matches(c) {
                return c;
            }
            seen += 1;
            if total - seen >= keep {
                'X'
            } else {
                c
            }
        })
        .collect()
}

/// Groups up to twelve digits in fours: `1234 5678 9012`.
pub fn format_aadhaar(value: &str) -> String {
    let digits: Vec<char> = value.chars().filter(char::is_ascii_digit).take(12).collect();
    digits
        .chunks(4)
        .map(|chunk| chunk.iter().collect::<String>())
        .collect::<Vec<_>>()
        .join(" ")
}

/// `XXXX XXXX 9012` once more than eight digits are present.
pub fn mask_aadhaar(value: &str) -> String {
    let cleaned: String = value.split_whitespace().collect();
    if cleaned.chars().count() <= 8 {
        return format_aadhaar(value);
    }
    let tail: String = cleaned.chars().skip(8).collect();
    format!("XXXX XXXX {tail}")
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WalletKind {
    MetaMask,
    Rainbow,
    WalletConnect,
}

impl WalletKind {
    pub fn id(self) -> &'static str {
        match self {
            WalletKind::MetaMask => "metamask",
            WalletKind::Rainbow => "rainbow",
            WalletKind::WalletConnect => "walletconnect",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            WalletKind::MetaMask => "MetaMask Mobile",
            WalletKind::Rainbow => "Rainbow Wallet",
            WalletKind::WalletConnect => "WalletConnect",
        }
    }
}

impl FromStr for WalletKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "metamask" => Ok(WalletKind::MetaMask),
            "rainbow" => Ok(WalletKind::Rainbow),
            "walletconnect" => Ok(WalletKind::WalletConnect),
            other => Err(format!("unknown wallet {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WalletSession {
    pub kind: WalletKind,
    pub address: String,
    pub balance: String,
}

/// What the onboarding screens have recorded about the user so far.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingProfile {
    pub wallet: Option<WalletSession>,
    pub kyc: Option<KycForm>,
    pub zk_keys_generated: bool,
}

impl OnboardingProfile {
    pub fn is_wallet_connected(&self) -> bool {
        self.wallet.is_some()
    }

    pub fn is_kyc_completed(&self) -> bool {
        self.kyc.is_some()
    }

    /// The main app opens once a wallet is connected and keys exist.
    pub fn is_onboarded(&self) -> bool {
        self.is_wallet_connected() && self.zk_keys_generated
    }
}

#[async_trait]
pub trait OnboardingBackend: Send + Sync {
    async fn connect_wallet(&self, kind: WalletKind) -> anyhow::Result<WalletSession>;
    async fn generate_keys(&self) -> anyhow::Result<()>;
    /// Stores the masked KYC record.
    async fn complete_kyc(&self, form: &KycForm) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OnboardingTimings {
    pub connect_delay_ms: u64,
    pub key_delay_ms: u64,
}

impl Default for OnboardingTimings {
    fn default() -> Self {
        Self {
            connect_delay_ms: 2_000,
            key_delay_ms: 3_000,
        }
    }
}

/// In-memory onboarding with mock wallets and timed key generation.
#[derive(Debug, Clone, Default)]
pub struct SimulatedOnboarding {
    profile: Arc<Mutex<OnboardingProfile>>,
    timings: OnboardingTimings,
}

impl SimulatedOnboarding {
    pub fn new(timings: OnboardingTimings) -> Self {
        Self {
            profile: Arc::default(),
            timings,
        }
    }

    pub fn profile(&self) -> OnboardingProfile {
        self.lock().clone()
    }

    pub fn reset(&self) {
        *self.lock() = OnboardingProfile::default();
    }

    fn lock(&self) -> MutexGuard<'_, OnboardingProfile> {
        self.profile.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl OnboardingBackend for SimulatedOnboarding {
    async fn connect_wallet(&self, kind: WalletKind) -> anyhow::Result<WalletSession> {
        sleep(Duration::from_millis(self.timings.connect_delay_ms)).await;
        let session = {
            let mut rng = rand::thread_rng();
            WalletSession {
                kind,
                address: zk_core::Placeholder::Address.generate(&mut rng),
                balance: zk_core::wallet_balance(&mut rng),
            }
        };
        info!("connected {} wallet {}", kind.id(), session.address);
        self.lock().wallet = Some(session.clone());
        Ok(session)
    }

    async fn generate_keys(&self) -> anyhow::Result<()> {
        sleep(Duration::from_millis(self.timings.key_delay_ms)).await;
        self.lock().zk_keys_generated = true;
        info!("privacy keys generated");
        Ok(())
    }

    async fn complete_kyc(&self, form: &KycForm) -> anyhow::Result<()> {
        self.lock().kyc = Some(form.masked());
        Ok(())
    }
}
