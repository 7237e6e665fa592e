mod gateway;
mod otp;

pub(crate) use gateway::{GatewayReply, HttpGateway, OtpGateway};
pub(crate) use otp::{is_valid_email, LoginError, OtpPolicy, OtpVerifier};
