use thiserror::Error;

use crate::geo::Coordinate;

/// Failures reported by a route gateway.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RoutingError {
    #[error("no route found")]
    NoRoute,
    #[error("invalid coordinate {0}")]
    InvalidCoordinate(Coordinate),
    #[error("routing service returned status {0}")]
    Api(String),
    #[error("http error: {0}")]
    Http(String),
}

pub type RoutingResult<T> = Result<T, RoutingError>;
