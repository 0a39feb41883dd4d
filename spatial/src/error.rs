use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SpatialError {
    #[error("non-finite coordinate for {id}: lon={lon} lat={lat}")]
    NonFiniteCoordinate { id: String, lon: f64, lat: f64 },
}

pub type Result<T> = std::result::Result<T, SpatialError>;
