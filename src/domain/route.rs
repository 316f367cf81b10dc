//! Maps navigation locations onto `(service, step, resource)` and back.
//!
//! Location shapes understood by [`classify`]:
//!
//! * `/{service}` - first step of the flow
//! * `/{service}/{step}` - a named step
//! * `/{service}/{resource}` - first resource-scoped step (scoped services only)
//! * `/{service}/{resource}/{step}` - a step of a resource-scoped flow
//!
//! For scoped services the resource id may also come from the query
//! (`hotelId`, `vehicleId`) when the path does not carry it.

use super::service::{BookingStep, ServiceType};
use std::collections::HashMap;

/// Upper bound on resource id length.
pub const MAX_RESOURCE_ID_LEN: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch {
    pub service: ServiceType,
    pub step: BookingStep,
    pub resource_id: Option<String>,
}

/// A location split into its path and query parameters.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Location {
    pub path: String,
    pub query: HashMap<String, String>,
}

impl Location {
    /// Splits `raw` at the first `?`, dropping any `#fragment`.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.split('#').next().unwrap_or_default();
        let (path, query) = match raw.split_once('?') {
            Some((path, query)) => (path, query),
            None => (raw, ""),
        };

        let query = query
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| match pair.split_once('=') {
                Some((k, v)) => (k.to_string(), v.to_string()),
                None => (pair.to_string(), String::new()),
            })
            .collect();

        Self {
            path: path.to_string(),
            query,
        }
    }
}

/// Format check only; whether the item exists is not decided here.
pub fn is_valid_resource_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_RESOURCE_ID_LEN
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Classifies a raw location string such as `/hotels/H-1/guests?x=1`.
pub fn classify_location(raw: &str) -> Option<RouteMatch> {
    let location = Location::parse(raw);
    classify(&location.path, &location.query)
}

/// Maps a path and its query onto a flow position.
///
/// Returns `None` for anything that is not part of a booking flow; no
/// redirect decision is made here.
pub fn classify(path: &str, query: &HashMap<String, String>) -> Option<RouteMatch> {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let (slug, rest) = segments.split_first()?;
    let service = ServiceType::from_slug(slug)?;
    let graph = service.step_graph();

    let query_resource = service
        .resource_param()
        .and_then(|param| query.get(param))
        .filter(|id| is_valid_resource_id(id))
        .cloned();

    let (step, resource_id) = match rest {
        [] => (graph.first(), query_resource),
        [segment] => {
            if let Some(step) = BookingStep::from_name(segment).filter(|s| graph.contains(*s)) {
                (step, query_resource)
            } else if service.is_resource_scoped() && is_valid_resource_id(segment) {
                (first_scoped_step(service), Some(segment.to_string()))
            } else {
                return None;
            }
        }
        [resource, step] if service.is_resource_scoped() => {
            if !is_valid_resource_id(resource) {
                return None;
            }
            let step = BookingStep::from_name(step).filter(|s| graph.contains(*s))?;
            (step, Some(resource.to_string()))
        }
        _ => return None,
    };

    Some(RouteMatch {
        service,
        step,
        resource_id,
    })
}

/// Builds the canonical path for a flow position.
///
/// Resource-scoped services need a valid resource id for every step after
/// the first; `None` is returned when it is missing or malformed, or when
/// `step` does not belong to `service`.
pub fn step_path(service: ServiceType, step: BookingStep, resource_id: Option<&str>) -> Option<String> {
    let graph = service.step_graph();
    if !graph.contains(step) {
        return None;
    }

    if step == graph.first() {
        return Some(format!("/{}", service.as_str()));
    }

    if !service.is_resource_scoped() {
        return Some(format!("/{}/{}", service.as_str(), step.as_str()));
    }

    let resource_id = resource_id.filter(|id| is_valid_resource_id(id))?;
    if step == first_scoped_step(service) {
        Some(format!("/{}/{}", service.as_str(), resource_id))
    } else {
        Some(format!(
            "/{}/{}/{}",
            service.as_str(),
            resource_id,
            step.as_str()
        ))
    }
}

/// The step a bare `/{service}/{resource}` location lands on.
fn first_scoped_step(service: ServiceType) -> BookingStep {
    let graph = service.step_graph();
    graph.get(1).unwrap_or_else(|| graph.first())
}
