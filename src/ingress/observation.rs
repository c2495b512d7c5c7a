//! Observation decoding and assembly.
//!
//! A detector payload is a UTF-8 JSON array of numbers in one of two
//! accepted shapes: *raw* (sensor features only) or *full* (one-hot
//! current green ++ min-green flag ++ sensor features). Shape is decided
//! purely by length; anything else is malformed.

use crate::error::IngressError;

/// Accepted observation vector shapes for one intersection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObservationLayout {
    /// Sensor feature count of a raw vector.
    pub raw_len: usize,
    /// Number of green phases (one-hot width).
    pub green_count: usize,
}

impl ObservationLayout {
    /// Length of a full vector: one-hot ++ min-green flag ++ raw.
    #[must_use]
    pub const fn full_len(&self) -> usize {
        self.green_count + 1 + self.raw_len
    }
}

/// A shape-checked observation ready for the decision oracle.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    features: Vec<f32>,
    layout: ObservationLayout,
}

impl Observation {
    /// Builds a full observation from a raw sensor vector and the current
    /// controller state.
    ///
    /// The head is a one-hot over the green sequence at `green_index`,
    /// followed by the min-green flag, followed by the raw features.
    #[must_use]
    pub fn assemble(
        raw: Vec<f32>,
        green_index: usize,
        min_green_satisfied: bool,
        layout: ObservationLayout,
    ) -> Self {
        let mut features = Vec::with_capacity(layout.full_len());
        for i in 0..layout.green_count {
            features.push(if i == green_index { 1.0 } else { 0.0 });
        }
        features.push(if min_green_satisfied { 1.0 } else { 0.0 });
        features.extend_from_slice(&raw);
        Self { features, layout }
    }

    /// The complete feature vector.
    #[must_use]
    pub fn features(&self) -> &[f32] {
        &self.features
    }

    /// The sensor-feature tail of the vector.
    #[must_use]
    pub fn raw_features(&self) -> &[f32] {
        &self.features[self.layout.green_count + 1..]
    }

    /// The min-green flag entry.
    #[must_use]
    pub fn min_green_flag(&self) -> f32 {
        self.features[self.layout.green_count]
    }

    /// Index of the green phase encoded in the one-hot head, if exactly
    /// one entry is set.
    #[must_use]
    pub fn current_green_index(&self) -> Option<usize> {
        let head = &self.features[..self.layout.green_count];
        let mut hot = None;
        for (i, v) in head.iter().enumerate() {
            if *v == 1.0 {
                if hot.is_some() {
                    return None;
                }
                hot = Some(i);
            }
        }
        hot
    }
}

/// A decoded detector payload, classified by length.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedPayload {
    /// Sensor features only; the caller assembles the full vector.
    Raw(Vec<f32>),
    /// Already carries phase context; passed through unchanged.
    Full(Observation),
}

/// Decodes one detector payload.
///
/// # Errors
///
/// Returns an [`IngressError`] if the payload is not a JSON number array
/// or its length matches neither accepted shape.
pub fn decode(payload: &[u8], layout: ObservationLayout) -> Result<DecodedPayload, IngressError> {
    let values: Vec<f32> = serde_json::from_slice(payload)?;

    if values.len() == layout.raw_len {
        Ok(DecodedPayload::Raw(values))
    } else if values.len() == layout.full_len() {
        Ok(DecodedPayload::Full(Observation {
            features: values,
            layout,
        }))
    } else {
        Err(IngressError::UnexpectedLength {
            got: values.len(),
            raw: layout.raw_len,
            full: layout.full_len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LAYOUT: ObservationLayout = ObservationLayout {
        raw_len: 6,
        green_count: 4,
    };

    #[test]
    fn full_len_adds_head_and_flag() {
        assert_eq!(LAYOUT.full_len(), 11);
    }

    #[test]
    fn classifies_raw_by_length() {
        let payload = serde_json::to_vec(&vec![0.5f32; 6]).unwrap();
        let decoded = decode(&payload, LAYOUT).unwrap();
        assert_eq!(decoded, DecodedPayload::Raw(vec![0.5; 6]));
    }

    #[test]
    fn classifies_full_by_length_and_passes_through() {
        let values: Vec<f32> = vec![0.0, 0.0, 1.0, 0.0, 1.0, 0.1, 0.2, 0.3, 0.4, 0.5, 0.6];
        let payload = serde_json::to_vec(&values).unwrap();
        match decode(&payload, LAYOUT).unwrap() {
            DecodedPayload::Full(obs) => {
                assert_eq!(obs.features(), values.as_slice());
                assert_eq!(obs.current_green_index(), Some(2));
                assert_eq!(obs.min_green_flag(), 1.0);
                assert_eq!(obs.raw_features(), &values[5..]);
            }
            other => panic!("expected full observation, got {other:?}"),
        }
    }

    #[test]
    fn rejects_unexpected_length() {
        let payload = serde_json::to_vec(&vec![0.5f32; 9]).unwrap();
        let err = decode(&payload, LAYOUT).unwrap_err();
        assert!(matches!(
            err,
            IngressError::UnexpectedLength {
                got: 9,
                raw: 6,
                full: 11,
            }
        ));
    }

    #[test]
    fn rejects_non_array_payload() {
        assert!(decode(b"{\"queue\": 3}", LAYOUT).is_err());
        assert!(decode(b"not json at all", LAYOUT).is_err());
        assert!(decode(b"", LAYOUT).is_err());
    }

    #[test]
    fn assembles_one_hot_head_and_flag() {
        let raw = vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6];
        let obs = Observation::assemble(raw.clone(), 1, false, LAYOUT);

        assert_eq!(&obs.features()[..4], &[0.0, 1.0, 0.0, 0.0]);
        assert_eq!(obs.min_green_flag(), 0.0);
        assert_eq!(obs.raw_features(), raw.as_slice());
        assert_eq!(obs.features().len(), LAYOUT.full_len());
        assert_eq!(obs.current_green_index(), Some(1));
    }

    #[test]
    fn assembled_flag_reflects_min_green() {
        let obs = Observation::assemble(vec![0.0; 6], 0, true, LAYOUT);
        assert_eq!(obs.min_green_flag(), 1.0);
    }

    #[test]
    fn ambiguous_one_hot_is_rejected() {
        let values: Vec<f32> = vec![1.0, 1.0, 0.0, 0.0, 0.0, 0.1, 0.2, 0.3, 0.4, 0.5, 0.6];
        let payload = serde_json::to_vec(&values).unwrap();
        match decode(&payload, LAYOUT).unwrap() {
            DecodedPayload::Full(obs) => assert_eq!(obs.current_green_index(), None),
            other => panic!("expected full observation, got {other:?}"),
        }
    }
}
