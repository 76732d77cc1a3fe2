mod clock;
mod payment_signature;

pub use clock::{Clock, SystemClock};
pub use payment_signature::{
    constant_time_eq,
    hmac_hex,
    payment_signature_message,
    sign_payment,
    verify_hmac_hex,
    verify_payment_signature,
};
