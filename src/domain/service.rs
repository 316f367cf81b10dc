use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the independent purchase flows offered by the site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ServiceType {
    Hotels,
    CarHire,
    VisaApplication,
    TravelInsurance,
}

impl ServiceType {
    pub const ALL: [ServiceType; 4] = [
        ServiceType::Hotels,
        ServiceType::CarHire,
        ServiceType::VisaApplication,
        ServiceType::TravelInsurance,
    ];

    /// Canonical slug, also used as the storage namespace.
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceType::Hotels => "hotels",
            ServiceType::CarHire => "car-hire",
            ServiceType::VisaApplication => "visa-application",
            ServiceType::TravelInsurance => "travel-insurance",
        }
    }

    /// Resolves a slug or one of its aliases.
    pub fn from_slug(slug: &str) -> Option<Self> {
        match slug {
            "hotels" | "hotel" => Some(ServiceType::Hotels),
            "car-hire" | "cars" => Some(ServiceType::CarHire),
            "visa-application" | "visa" => Some(ServiceType::VisaApplication),
            "travel-insurance" | "insurance" => Some(ServiceType::TravelInsurance),
            _ => None,
        }
    }

    /// Ordered steps of this service's flow.
    pub fn step_graph(&self) -> StepGraph {
        let steps: &'static [BookingStep] = match self {
            ServiceType::Hotels => &[
                BookingStep::Search,
                BookingStep::Details,
                BookingStep::Guests,
                BookingStep::Payment,
                BookingStep::Success,
            ],
            ServiceType::CarHire => &[
                BookingStep::Search,
                BookingStep::Vehicle,
                BookingStep::Driver,
                BookingStep::Payment,
                BookingStep::Success,
            ],
            ServiceType::VisaApplication => &[
                BookingStep::Eligibility,
                BookingStep::Applicants,
                BookingStep::Documents,
                BookingStep::Review,
                BookingStep::Payment,
                BookingStep::Success,
            ],
            ServiceType::TravelInsurance => &[
                BookingStep::Quote,
                BookingStep::Plans,
                BookingStep::Travellers,
                BookingStep::Payment,
                BookingStep::Success,
            ],
        };
        StepGraph {
            service: *self,
            steps,
        }
    }

    /// Name of the query parameter carrying the resource id, for services
    /// whose flow is scoped to a single purchased item.
    pub fn resource_param(&self) -> Option<&'static str> {
        match self {
            ServiceType::Hotels => Some("hotelId"),
            ServiceType::CarHire => Some("vehicleId"),
            ServiceType::VisaApplication | ServiceType::TravelInsurance => None,
        }
    }

    pub fn is_resource_scoped(&self) -> bool {
        self.resource_param().is_some()
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_slug(s).ok_or_else(|| format!("unknown service '{}'", s))
    }
}

/// A named stage of a purchase flow.
///
/// A step only has meaning together with the [`ServiceType`] whose
/// [`StepGraph`] contains it; `Vehicle` is not a hotels step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BookingStep {
    Search,
    Details,
    Guests,
    Vehicle,
    Driver,
    Eligibility,
    Applicants,
    Documents,
    Review,
    Quote,
    Plans,
    Travellers,
    Payment,
    Success,
}

impl BookingStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStep::Search => "search",
            BookingStep::Details => "details",
            BookingStep::Guests => "guests",
            BookingStep::Vehicle => "vehicle",
            BookingStep::Driver => "driver",
            BookingStep::Eligibility => "eligibility",
            BookingStep::Applicants => "applicants",
            BookingStep::Documents => "documents",
            BookingStep::Review => "review",
            BookingStep::Quote => "quote",
            BookingStep::Plans => "plans",
            BookingStep::Travellers => "travellers",
            BookingStep::Payment => "payment",
            BookingStep::Success => "success",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let step = match name {
            "search" => BookingStep::Search,
            "details" => BookingStep::Details,
            "guests" => BookingStep::Guests,
            "vehicle" => BookingStep::Vehicle,
            "driver" => BookingStep::Driver,
            "eligibility" => BookingStep::Eligibility,
            "applicants" => BookingStep::Applicants,
            "documents" => BookingStep::Documents,
            "review" => BookingStep::Review,
            "quote" => BookingStep::Quote,
            "plans" => BookingStep::Plans,
            "travellers" => BookingStep::Travellers,
            "payment" => BookingStep::Payment,
            "success" => BookingStep::Success,
            _ => return None,
        };
        Some(step)
    }
}

impl fmt::Display for BookingStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStep {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| format!("unknown step '{}'", s))
    }
}

/// The fixed, ordered list of steps for one service.
///
/// Index order is the total order used for progress and accessibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepGraph {
    service: ServiceType,
    steps: &'static [BookingStep],
}

impl StepGraph {
    pub fn service(&self) -> ServiceType {
        self.service
    }

    pub fn steps(&self) -> &'static [BookingStep] {
        self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn first(&self) -> BookingStep {
        // Every graph is defined with at least one step.
        self.steps.first().copied().unwrap_or(BookingStep::Search)
    }

    pub fn contains(&self, step: BookingStep) -> bool {
        self.steps.contains(&step)
    }

    /// Position of `step`, or `None` if it is not part of this flow.
    pub fn index_of(&self, step: BookingStep) -> Option<usize> {
        self.steps.iter().position(|s| *s == step)
    }

    pub fn get(&self, index: usize) -> Option<BookingStep> {
        self.steps.get(index).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug_aliases_resolve_to_canonical_service() {
        assert_eq!(ServiceType::from_slug("hotel"), Some(ServiceType::Hotels));
        assert_eq!(ServiceType::from_slug("cars"), Some(ServiceType::CarHire));
        assert_eq!(
            ServiceType::from_slug("visa"),
            Some(ServiceType::VisaApplication)
        );
        assert_eq!(
            ServiceType::from_slug("insurance"),
            Some(ServiceType::TravelInsurance)
        );
        assert_eq!(ServiceType::from_slug("flights"), None);
    }

    #[test]
    fn test_canonical_slug_round_trips() {
        for service in ServiceType::ALL {
            assert_eq!(service.as_str().parse::<ServiceType>(), Ok(service));
        }
    }

    #[test]
    fn test_every_graph_starts_somewhere_and_ends_in_success() {
        for service in ServiceType::ALL {
            let graph = service.step_graph();
            assert!(!graph.is_empty());
            assert_eq!(graph.get(graph.len() - 1), Some(BookingStep::Success));
            assert_eq!(graph.index_of(graph.first()), Some(0));
        }
    }

    #[test]
    fn test_step_membership_is_scoped_to_service() {
        assert!(ServiceType::CarHire.step_graph().contains(BookingStep::Vehicle));
        assert!(!ServiceType::Hotels.step_graph().contains(BookingStep::Vehicle));
        assert_eq!(ServiceType::Hotels.step_graph().index_of(BookingStep::Vehicle), None);
    }

    #[test]
    fn test_serde_uses_kebab_case() {
        let json = serde_json::to_string(&ServiceType::VisaApplication).unwrap();
        assert_eq!(json, "\"visa-application\"");
        let step: BookingStep = serde_json::from_str("\"travellers\"").unwrap();
        assert_eq!(step, BookingStep::Travellers);
    }
}
