//! Selectors for the tee sheet booking pages. These track the site's current
//! markup and are expected to drift; each target lists its fallbacks in
//! priority order.

use crate::locator::{Locator, LocatorChain};

pub const DEFAULT_LOGIN_URL: &str = "https://foreupsoftware.com/index.php/booking/20954#/login";

pub const DEFAULT_RATE_CLASS: &str = "Resident Adult (4-14 Days) Advance";

pub fn username_field() -> LocatorChain {
    LocatorChain::new(
        "username field",
        vec![
            Locator::css(r#"input[name="username"]"#),
            Locator::css(r#"input[type="email"]"#),
            Locator::css("#username"),
        ],
    )
}

pub fn password_field() -> LocatorChain {
    LocatorChain::new(
        "password field",
        vec![
            Locator::css(r#"input[name="password"]"#),
            Locator::css(r#"input[type="password"]"#),
            Locator::css("#password"),
        ],
    )
}

pub fn sign_in_button() -> LocatorChain {
    LocatorChain::new(
        "sign in button",
        vec![
            Locator::containing_text("button", "Sign In"),
            Locator::css(r#"input[type="submit"][value*="Sign"]"#),
            Locator::XPath(format!(
                "//*[{} and contains(normalize-space(.), \"Sign In\")]",
                crate::locator::has_class("btn")
            )),
            Locator::css(r#"button[type="submit"]"#),
        ],
    )
}

pub fn rate_class_button(rate_class: &str) -> LocatorChain {
    LocatorChain::new(
        "rate class button",
        vec![
            Locator::containing_text("button", rate_class),
            Locator::containing_text("a", rate_class),
        ],
    )
}

/// Containers of individual tee times. A single selector list keeps the
/// matches in document order.
pub fn tee_time_slots() -> Locator {
    Locator::css(".booking-slot, .tee-time-slot, .time-slot")
}

pub fn slot_time() -> Locator {
    Locator::css(".time, .booking-slot-time")
}

pub fn slot_available_players() -> Locator {
    Locator::css(".js-booking-slot-players span:last-child")
}

pub fn player_count_buttons() -> Locator {
    Locator::css(r#".js-booking-field-buttons[data-field="players"] a"#)
}

pub fn no_cart_button() -> LocatorChain {
    LocatorChain::new(
        "no cart option",
        vec![Locator::css(
            r#".js-booking-field-buttons[data-field="carts"] a[data-value="no"]"#,
        )],
    )
}

pub fn book_button() -> LocatorChain {
    LocatorChain::new(
        "book time button",
        vec![
            Locator::css(".js-book-button"),
            Locator::containing_text("button", "Book Time"),
        ],
    )
}
