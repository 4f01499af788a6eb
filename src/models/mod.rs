pub mod config;
pub mod inactivity;
pub mod otp;

pub use config::{
    AppConfig, AuthProviderConfig, HostedProviderConfig, InactivitySettings, MemoryProviderConfig,
    ServerConfig,
};
pub use inactivity::InactivityPolicy;
pub use otp::{
    LoginRequest, OtpSentResponse, RegisterRequest, SessionTokens, UserInfo, VerifyRequest,
    VerifyResponse,
};
