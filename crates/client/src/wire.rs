//! Request and response encoding for the back-office REST service.
//!
//! Requests are the service's custom "map of string entries" XML posted as
//! `text/xml`; responses are a JSON envelope of shape `{"object": {...}}`.
//! The proposal records inside a fetch response are loosely typed on the
//! wire (numbers arrive as numbers or strings depending on the backend
//! path), so decoding is tolerant there and strict at the `Proposal`
//! conversion boundary.

use secrecy::ExposeSecret;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};

use rebill_core::{AccountCode, Credentials, Proposal, ProposalId, SessionError};
use rust_decimal::Decimal;

/// Ordered `<map><entry>..</entry></map>` body builder.
#[derive(Clone, Debug, Default)]
pub struct MapBody {
    entries: Vec<(String, String)>,
}

impl MapBody {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.entries.push((key.into(), value.into()));
        self
    }

    pub fn render(&self) -> String {
        let mut body = String::from("<map>");
        for (key, value) in &self.entries {
            body.push_str("<entry><string>");
            body.push_str(&escape_xml(key));
            body.push_str("</string><string>");
            body.push_str(&escape_xml(value));
            body.push_str("</string></entry>");
        }
        body.push_str("</map>");
        body
    }
}

fn escape_xml(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            other => escaped.push(other),
        }
    }
    escaped
}

pub fn login_body(credentials: &Credentials) -> String {
    MapBody::new()
        .entry("usuario", &credentials.username)
        .entry("password", credentials.password.expose_secret())
        .render()
}

/// Fetch filter: only `productor` is set; the remaining filters stay empty so
/// the service returns every pending automatic-renewal proposal for the code.
pub fn proposals_body(code: &AccountCode) -> String {
    MapBody::new()
        .entry("productor", &code.0)
        .entry("poliza", "")
        .entry("socio", "")
        .entry("razonSocial", "")
        .entry("patente", "")
        .entry("propuesta", "")
        .entry("fechaCarga", "")
        .entry("seccion", "")
        .entry("propuestaProrrogaAutomatica", "true")
        .entry("dniOcuit", "")
        .entry("tarifaPorUso", "")
        .entry("esFlota", "false")
        .render()
}

pub fn amend_body(proposal: &Proposal) -> String {
    MapBody::new()
        .entry("propuesta", &proposal.id.0)
        .entry("renovacion", &proposal.renewal)
        .entry("seccion", proposal.section_number.to_string())
        .entry("premio", proposal.premium.to_string())
        .entry("sumaAsegurada", "")
        .entry("emitePoliza", if proposal.issue_policy { "true" } else { "false" })
        .entry("endoso", proposal.endorsement_id.to_string())
        .render()
}

#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub object: T,
}

#[derive(Debug, Deserialize)]
pub struct LoginObject {
    pub ticket: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProposalsObject {
    #[serde(default)]
    pub results: Vec<ProposalRecord>,
}

#[derive(Debug, Deserialize)]
pub struct EndorsementObject {
    pub xml: Option<String>,
}

/// Raw proposal record with the service's field names. Numeric fields accept
/// both JSON numbers and numeric strings.
#[derive(Debug, Deserialize)]
pub struct ProposalRecord {
    #[serde(default, deserialize_with = "flexible_string")]
    pub propuesta: Option<String>,
    #[serde(default, deserialize_with = "flexible_string")]
    pub renovacion: Option<String>,
    #[serde(rename = "numeroSeccion", default, deserialize_with = "flexible_u32")]
    pub numero_seccion: Option<u32>,
    #[serde(rename = "numeroPoliza", default, deserialize_with = "flexible_string")]
    pub numero_poliza: Option<String>,
    #[serde(default)]
    pub socio: Option<String>,
    #[serde(rename = "interesAsegurable", default)]
    pub interes_asegurable: Option<String>,
    #[serde(default)]
    pub patente: Option<String>,
    #[serde(rename = "periodoFacturacion", default)]
    pub periodo_facturacion: Option<String>,
    #[serde(rename = "cantidadCuota", default, deserialize_with = "flexible_u32")]
    pub cantidad_cuota: Option<u32>,
    #[serde(default, deserialize_with = "flexible_f64")]
    pub premio: Option<f64>,
    #[serde(rename = "premioAnterior", default, deserialize_with = "flexible_f64")]
    pub premio_anterior: Option<f64>,
    #[serde(rename = "sumaAsegurada", default, deserialize_with = "flexible_decimal")]
    pub suma_asegurada: Option<Decimal>,
    #[serde(rename = "sumaAseguradaAnterior", default, deserialize_with = "flexible_decimal")]
    pub suma_asegurada_anterior: Option<Decimal>,
    #[serde(default)]
    pub cobertura: Option<String>,
    #[serde(default, deserialize_with = "flexible_i64")]
    pub endoso: Option<i64>,
    #[serde(rename = "emitePoliza", default)]
    pub emite_poliza: Option<bool>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(f64),
    Text(String),
}

fn flexible_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    match Option::<NumberOrString>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberOrString::Number(value)) => Ok(Some(value)),
        Some(NumberOrString::Text(raw)) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            trimmed
                .parse()
                .map(Some)
                .map_err(|_| D::Error::custom(format!("expected a number, got `{raw}`")))
        }
    }
}

fn flexible_u32<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
    match flexible_f64(deserializer)? {
        None => Ok(None),
        Some(value) if value >= 0.0 && value.fract() == 0.0 && value <= u32::MAX as f64 => {
            Ok(Some(value as u32))
        }
        Some(value) => Err(D::Error::custom(format!("expected a whole count, got `{value}`"))),
    }
}

fn flexible_i64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    match flexible_f64(deserializer)? {
        None => Ok(None),
        Some(value) if value.fract() == 0.0 => Ok(Some(value as i64)),
        Some(value) => Err(D::Error::custom(format!("expected an integer, got `{value}`"))),
    }
}

fn flexible_decimal<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<Decimal>, D::Error> {
    match Option::<NumberOrString>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberOrString::Number(value)) => Ok(Decimal::try_from(value).ok()),
        Some(NumberOrString::Text(raw)) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            trimmed
                .parse()
                .map(Some)
                .map_err(|_| D::Error::custom(format!("expected an amount, got `{raw}`")))
        }
    }
}

fn flexible_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    match Option::<NumberOrString>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberOrString::Text(raw)) => Ok(Some(raw)),
        Some(NumberOrString::Number(value)) => {
            if value.fract() == 0.0 {
                Ok(Some(format!("{}", value as i64)))
            } else {
                Ok(Some(value.to_string()))
            }
        }
    }
}

impl TryFrom<ProposalRecord> for Proposal {
    type Error = SessionError;

    fn try_from(record: ProposalRecord) -> Result<Self, Self::Error> {
        let id = record
            .propuesta
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| SessionError::MalformedProposal("record missing `propuesta`".into()))?;
        let installment_count = record.cantidad_cuota.filter(|count| *count > 0).ok_or_else(
            || {
                SessionError::MalformedProposal(format!(
                    "proposal {id} missing a positive `cantidadCuota`"
                ))
            },
        )?;
        let raw_premium = record.premio.filter(|value| value.is_finite() && *value > 0.0).ok_or_else(
            || SessionError::MalformedProposal(format!("proposal {id} missing a positive `premio`")),
        )?;

        let proposal = Proposal {
            id: ProposalId(id),
            renewal: record.renovacion.unwrap_or_default(),
            section_number: record.numero_seccion.unwrap_or(0),
            policy_number: record.numero_poliza.unwrap_or_default(),
            insured_name: record.socio.unwrap_or_default(),
            vehicle: record.interes_asegurable.unwrap_or_default(),
            plate: record.patente.unwrap_or_default(),
            billing_period: record.periodo_facturacion.unwrap_or_default(),
            installment_count,
            // Ceil so the stored whole-peso premium never undershoots the
            // quoted value; negotiation rounds up to 100s right after anyway.
            premium: raw_premium.ceil() as i64,
            premium_previous: record.premio_anterior.map(|value| value.ceil() as i64).unwrap_or(0),
            sum_insured: record.suma_asegurada,
            sum_insured_previous: record.suma_asegurada_anterior,
            coverage: record.cobertura.unwrap_or_default(),
            endorsement_id: record.endoso.unwrap_or(-1),
            issue_policy: record.emite_poliza.unwrap_or(true),
        };
        proposal.validate()?;
        Ok(proposal)
    }
}
