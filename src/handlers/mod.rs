pub mod health;
pub mod inactivity;
pub mod otp;
