//! Classification of the renegotiation endpoint's response payload.
//!
//! The back office does not signal a surcharge rejection through the HTTP
//! status; it embeds a fixed phrase inside the `object.xml` string of an
//! otherwise successful reply. That phrase is an external contract owned by
//! the service and may change without notice, so detection lives behind a
//! trait and tests inject canned bodies.

/// Exact wording the service emits when the proposed premium's markup is
/// above the allowed percentage.
pub const SURCHARGE_REJECTION_PHRASE: &str = "recargo que excede el porcentaje permitido";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Classification {
    Accepted,
    SurchargeRejected,
}

pub trait ResponseClassifier: Send + Sync {
    fn classify(&self, body: &str) -> Classification;
}

/// Default classifier: substring match on the service's rejection phrase.
#[derive(Clone, Copy, Debug, Default)]
pub struct SurchargePhraseClassifier;

impl ResponseClassifier for SurchargePhraseClassifier {
    fn classify(&self, body: &str) -> Classification {
        if body.contains(SURCHARGE_REJECTION_PHRASE) {
            Classification::SurchargeRejected
        } else {
            Classification::Accepted
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Classification, ResponseClassifier, SurchargePhraseClassifier};

    #[test]
    fn detects_rejection_phrase_inside_larger_body() {
        let body = "<mensaje>Se ha detectado un recargo que excede el porcentaje \
                    permitido para la propuesta 1234</mensaje>";
        assert_eq!(SurchargePhraseClassifier.classify(body), Classification::SurchargeRejected);
    }

    #[test]
    fn anything_else_counts_as_accepted() {
        assert_eq!(
            SurchargePhraseClassifier.classify("<mensaje>Operacion exitosa</mensaje>"),
            Classification::Accepted
        );
        assert_eq!(SurchargePhraseClassifier.classify(""), Classification::Accepted);
    }
}
