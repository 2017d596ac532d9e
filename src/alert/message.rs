//! Alert text sent to each contact.

use crate::response::{Coordinates, LocationError};

/// Substituted for the maps link when no position could be obtained.
pub const LOCATION_UNAVAILABLE: &str = "location unavailable";

/// Location line for the message body: a maps link, or the fallback text.
pub fn location_text(result: &Result<Coordinates, LocationError>) -> String {
    match result {
        Ok(coords) => coords.maps_link(),
        Err(_) => LOCATION_UNAVAILABLE.to_string(),
    }
}

/// ```
/// use sos_alert::alert::compose_message;
///
/// let text = compose_message("Ana", "Help!", "location unavailable");
/// assert_eq!(text, "Hey, Ana! Help!\n\nMy location:\nlocation unavailable");
/// ```
pub fn compose_message(name: &str, message: &str, location: &str) -> String {
    format!("Hey, {name}! {message}\n\nMy location:\n{location}")
}
