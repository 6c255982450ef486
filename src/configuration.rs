use crate::booker::BookingSettings;

pub trait Configuration: Clone + Send + Sync + 'static {
    fn service_name(&self) -> String;
    fn bind_address(&self) -> String;
    fn webdriver_url(&self) -> String;
    fn headless(&self) -> bool;
    fn booking_settings(&self) -> BookingSettings;

    fn day_offset(&self) -> u32 {
        self.booking_settings().day_offset
    }
}
