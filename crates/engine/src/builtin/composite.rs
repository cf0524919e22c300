//! 기본 컴포지트

use serde_json::json;

use flowprobe_core::types::{FieldType, InformationElement};

use crate::catalog::Catalog;
use crate::error::CatalogError;

pub(super) fn register(catalog: &mut Catalog) -> Result<(), CatalogError> {
    catalog.register_composite(
        "minimumIpTotalLength",
        json!(["min", "ipTotalLength"]),
        Some(InformationElement::iana(
            "minimumIpTotalLength",
            25,
            FieldType::Unsigned64,
        )),
    )?;
    catalog.register_composite(
        "maximumIpTotalLength",
        json!(["max", "ipTotalLength"]),
        Some(InformationElement::iana(
            "maximumIpTotalLength",
            26,
            FieldType::Unsigned64,
        )),
    )?;
    catalog.register_composite("meanIpTotalLength", json!(["mean", "ipTotalLength"]), None)?;
    catalog.register_composite(
        "forwardOctetCount",
        json!(["apply", "octetTotalCount", "forward"]),
        None,
    )?;
    catalog.register_composite(
        "backwardOctetCount",
        json!(["apply", "octetTotalCount", "backward"]),
        None,
    )?;
    Ok(())
}
