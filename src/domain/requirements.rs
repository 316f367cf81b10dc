//! Declarative table of the data each step needs before it counts as complete.

use super::service::{BookingStep, ServiceType};
use serde_json::Value;

/// How strictly a stored value is checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    /// Any non-null value.
    Present,
    /// A non-null value that is not an empty string, array or object.
    NonEmpty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequiredKey {
    pub key: &'static str,
    pub presence: Presence,
}

const fn present(key: &'static str) -> RequiredKey {
    RequiredKey {
        key,
        presence: Presence::Present,
    }
}

const fn non_empty(key: &'static str) -> RequiredKey {
    RequiredKey {
        key,
        presence: Presence::NonEmpty,
    }
}

impl RequiredKey {
    pub fn is_satisfied_by(&self, value: &Value) -> bool {
        match (self.presence, value) {
            (_, Value::Null) => false,
            (Presence::Present, _) => true,
            (Presence::NonEmpty, Value::String(s)) => !s.trim().is_empty(),
            (Presence::NonEmpty, Value::Array(items)) => !items.is_empty(),
            (Presence::NonEmpty, Value::Object(fields)) => !fields.is_empty(),
            (Presence::NonEmpty, _) => true,
        }
    }
}

/// Keys that must be stored for `step` of `service` to be complete.
///
/// Steps outside the service's graph, and terminal steps, require nothing.
pub fn required_keys(service: ServiceType, step: BookingStep) -> &'static [RequiredKey] {
    use BookingStep::*;
    use ServiceType::*;

    const HOTEL_SEARCH: &[RequiredKey] = &[present("search")];
    const HOTEL_DETAILS: &[RequiredKey] = &[present("selected_room")];
    const HOTEL_GUESTS: &[RequiredKey] = &[non_empty("guests")];
    const HOTEL_PAYMENT: &[RequiredKey] = &[non_empty("guests")];

    const CAR_SEARCH: &[RequiredKey] = &[present("search")];
    const CAR_VEHICLE: &[RequiredKey] = &[present("selected_vehicle")];
    const CAR_DRIVER: &[RequiredKey] = &[non_empty("driver")];
    const CAR_PAYMENT: &[RequiredKey] = &[present("selected_vehicle"), non_empty("driver")];

    const VISA_ELIGIBILITY: &[RequiredKey] = &[non_empty("visa_type")];
    const VISA_APPLICANTS: &[RequiredKey] = &[non_empty("applicants")];
    const VISA_DOCUMENTS: &[RequiredKey] = &[non_empty("documents")];
    const VISA_REVIEW: &[RequiredKey] = &[non_empty("applicants"), non_empty("documents")];
    const VISA_PAYMENT: &[RequiredKey] = &[non_empty("applicants")];

    const INSURANCE_QUOTE: &[RequiredKey] = &[present("trip")];
    const INSURANCE_PLANS: &[RequiredKey] = &[present("selected_plan")];
    const INSURANCE_TRAVELLERS: &[RequiredKey] = &[non_empty("travellers")];
    const INSURANCE_PAYMENT: &[RequiredKey] = &[present("selected_plan"), non_empty("travellers")];

    match (service, step) {
        (Hotels, Search) => HOTEL_SEARCH,
        (Hotels, Details) => HOTEL_DETAILS,
        (Hotels, Guests) => HOTEL_GUESTS,
        (Hotels, Payment) => HOTEL_PAYMENT,

        (CarHire, Search) => CAR_SEARCH,
        (CarHire, Vehicle) => CAR_VEHICLE,
        (CarHire, Driver) => CAR_DRIVER,
        (CarHire, Payment) => CAR_PAYMENT,

        (VisaApplication, Eligibility) => VISA_ELIGIBILITY,
        (VisaApplication, Applicants) => VISA_APPLICANTS,
        (VisaApplication, Documents) => VISA_DOCUMENTS,
        (VisaApplication, Review) => VISA_REVIEW,
        (VisaApplication, Payment) => VISA_PAYMENT,

        (TravelInsurance, Quote) => INSURANCE_QUOTE,
        (TravelInsurance, Plans) => INSURANCE_PLANS,
        (TravelInsurance, Travellers) => INSURANCE_TRAVELLERS,
        (TravelInsurance, Payment) => INSURANCE_PAYMENT,

        _ => &[],
    }
}
