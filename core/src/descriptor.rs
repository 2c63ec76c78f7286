//! The Subsystem Descriptor: a value object identifying one tensor factor.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{EngineError, Result};

/// Whether a subsystem carries optical attributes or is a bare internal
/// (e.g. atomic/memory) degree of freedom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubsystemKind {
    Light,
    Internal,
}

impl fmt::Display for SubsystemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Light => write!(f, "light"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

impl std::str::FromStr for SubsystemKind {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "light" => Ok(Self::Light),
            "internal" => Ok(Self::Internal),
            other => Err(EngineError::invalid_descriptor(format!(
                "unknown subsystem kind {other:?}"
            ))),
        }
    }
}

/// Photon polarization tag, required when [`SubsystemKind::Light`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Polarization {
    R,
    L,
    H,
    V,
}

impl fmt::Display for Polarization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Self::R => "R",
            Self::L => "L",
            Self::H => "H",
            Self::V => "V",
        };
        write!(f, "{tag}")
    }
}

impl std::str::FromStr for Polarization {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "R" => Ok(Self::R),
            "L" => Ok(Self::L),
            "H" => Ok(Self::H),
            "V" => Ok(Self::V),
            other => Err(EngineError::invalid_descriptor(format!(
                "unknown polarization tag {other:?}"
            ))),
        }
    }
}

/// A value object identifying one tensor factor of a Joint State.
///
/// Equality and hashing are by `id` alone, matching the contract that two
/// descriptors with the same id are the same subsystem regardless of how
/// their other fields were round-tripped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubsystemDescriptor {
    id: Uuid,
    kind: SubsystemKind,
    truncation: usize,
    wavelength: Option<f64>,
    polarization: Option<Polarization>,
}

impl SubsystemDescriptor {
    /// Construct a descriptor with a fresh random id, validating
    /// kind-specific attributes.
    pub fn new(
        kind: SubsystemKind,
        truncation: usize,
        wavelength: Option<f64>,
        polarization: Option<Polarization>,
    ) -> Result<Self> {
        Self::with_id(Uuid::new_v4(), kind, truncation, wavelength, polarization)
    }

    /// Construct a descriptor with an explicit id (used when rebuilding
    /// from a transport dictionary).
    pub fn with_id(
        id: Uuid,
        kind: SubsystemKind,
        truncation: usize,
        wavelength: Option<f64>,
        polarization: Option<Polarization>,
    ) -> Result<Self> {
        if truncation == 0 {
            return Err(EngineError::invalid_descriptor(
                "truncation must be a positive integer",
            ));
        }
        match kind {
            SubsystemKind::Light => {
                if wavelength.is_none() {
                    return Err(EngineError::invalid_descriptor(
                        "light subsystem requires a wavelength",
                    ));
                }
                if polarization.is_none() {
                    return Err(EngineError::invalid_descriptor(
                        "light subsystem requires a polarization",
                    ));
                }
            }
            SubsystemKind::Internal => {
                if wavelength.is_some() || polarization.is_some() {
                    return Err(EngineError::invalid_descriptor(
                        "internal subsystem must not carry optical attributes",
                    ));
                }
            }
        }
        Ok(Self {
            id,
            kind,
            truncation,
            wavelength,
            polarization,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn kind(&self) -> SubsystemKind {
        self.kind
    }

    pub fn truncation(&self) -> usize {
        self.truncation
    }

    pub fn wavelength(&self) -> Option<f64> {
        self.wavelength
    }

    pub fn polarization(&self) -> Option<Polarization> {
        self.polarization
    }

    /// Project to the stringified transport dictionary used by state
    /// envelopes: `{state_type, truncation, uuid, wavelength, polarization}`.
    pub fn to_dict(&self) -> HashMap<String, String> {
        let mut dict = HashMap::new();
        dict.insert("state_type".to_string(), self.kind.to_string());
        dict.insert("truncation".to_string(), self.truncation.to_string());
        dict.insert("uuid".to_string(), self.id.to_string());
        if let Some(w) = self.wavelength {
            dict.insert("wavelength".to_string(), w.to_string());
        }
        if let Some(p) = self.polarization {
            dict.insert("polarization".to_string(), p.to_string());
        }
        dict
    }

    /// Reconstruct a descriptor from a transport dictionary, restoring
    /// the typed fields from their stringified form.
    pub fn from_dict(dict: &HashMap<String, String>) -> Result<Self> {
        let kind: SubsystemKind = dict
            .get("state_type")
            .ok_or_else(|| EngineError::malformed_state("descriptor missing state_type"))?
            .parse()?;
        let truncation: usize = dict
            .get("truncation")
            .ok_or_else(|| EngineError::malformed_state("descriptor missing truncation"))?
            .parse()
            .map_err(|_| EngineError::malformed_state("truncation is not an integer"))?;
        let id: Uuid = dict
            .get("uuid")
            .ok_or_else(|| EngineError::malformed_state("descriptor missing uuid"))?
            .parse()
            .map_err(|_| EngineError::malformed_state("uuid is not well-formed"))?;
        let wavelength = dict
            .get("wavelength")
            .map(|w| {
                w.parse::<f64>()
                    .map_err(|_| EngineError::malformed_state("wavelength is not a real number"))
            })
            .transpose()?;
        let polarization = dict
            .get("polarization")
            .map(|p| p.parse::<Polarization>())
            .transpose()?;
        Self::with_id(id, kind, truncation, wavelength, polarization)
    }
}

impl PartialEq for SubsystemDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for SubsystemDescriptor {}

impl std::hash::Hash for SubsystemDescriptor {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn light_requires_wavelength_and_polarization() {
        let err = SubsystemDescriptor::new(SubsystemKind::Light, 3, None, None).unwrap_err();
        assert!(matches!(err, EngineError::InvalidDescriptor(_)));

        let ok = SubsystemDescriptor::new(
            SubsystemKind::Light,
            3,
            Some(1550.0),
            Some(Polarization::R),
        );
        assert!(ok.is_ok());
    }

    #[test]
    fn internal_rejects_optical_attributes() {
        let err =
            SubsystemDescriptor::new(SubsystemKind::Internal, 2, Some(1550.0), None).unwrap_err();
        assert!(matches!(err, EngineError::InvalidDescriptor(_)));
    }

    #[test]
    fn zero_truncation_is_rejected() {
        let err = SubsystemDescriptor::new(SubsystemKind::Internal, 0, None, None).unwrap_err();
        assert!(matches!(err, EngineError::InvalidDescriptor(_)));
    }

    #[test]
    fn equality_is_by_id_only() {
        let a = SubsystemDescriptor::new(SubsystemKind::Internal, 2, None, None).unwrap();
        let b = SubsystemDescriptor::with_id(a.id(), SubsystemKind::Internal, 5, None, None)
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn dict_round_trip_preserves_fields() {
        let desc = SubsystemDescriptor::new(
            SubsystemKind::Light,
            4,
            Some(1550.0),
            Some(Polarization::H),
        )
        .unwrap();
        let dict = desc.to_dict();
        let restored = SubsystemDescriptor::from_dict(&dict).unwrap();
        assert_eq!(desc, restored);
        assert_eq!(restored.truncation(), 4);
        assert_eq!(restored.wavelength(), Some(1550.0));
        assert_eq!(restored.polarization(), Some(Polarization::H));
    }
}
