//! Call control: out-of-band commands against the live phone call.
//!
//! Only the safety path uses this. Escalation replaces whatever the call is
//! doing with a spoken announcement followed by a hangup.

mod base;
mod twilio;

pub use base::{CallControl, CallControlError, DisabledCallControl};
pub use twilio::{TWILIO_API_URL, TwilioCallControl, TwilioCredentials, escalation_twiml};
