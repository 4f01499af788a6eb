// OTP authentication module
// Provider abstraction, hosted and in-memory providers, input validation

pub mod hosted;
pub mod memory;
pub mod provider;
pub mod validation;

pub use hosted::HostedAuthProvider;
pub use memory::MemoryAuthProvider;
pub use provider::{AuthProvider, AuthSession, AuthUser, OtpRequest, ProviderError};
