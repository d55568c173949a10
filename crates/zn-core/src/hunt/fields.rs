// Single-field activity searches.

use std::net::IpAddr;

use serde_json::Value;
use strum::{Display, EnumIter, EnumString};
use tracing::info;
use zn_api::{FilterExpr, FilterSet, NetworkFilterCatalog, ZnClient};
use zn_api::types::NetworkActivity;

use super::query::HuntQuery;
use crate::error::CoreError;

/// What kind of observable matched an activity.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumString, EnumIter,
)]
#[strum(serialize_all = "lowercase")]
pub enum Indicator {
    Executable,
    Domain,
    Port,
    Ip,
}

/// A filterable activity field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum HuntField {
    #[strum(serialize = "dstAsset")]
    Domain,
    #[strum(serialize = "srcProcessPath")]
    SourceProcess,
    #[strum(serialize = "dstProcessPath")]
    DestinationProcess,
    #[strum(serialize = "dstPort")]
    DestinationPort,
    #[strum(serialize = "dstIpAddress")]
    DestinationIp,
}

impl HuntField {
    /// Catalog filter id.
    pub fn filter_id(self) -> String {
        self.to_string()
    }

    pub fn indicator(self) -> Indicator {
        match self {
            Self::Domain => Indicator::Domain,
            Self::SourceProcess | Self::DestinationProcess => Indicator::Executable,
            Self::DestinationPort => Indicator::Port,
            Self::DestinationIp => Indicator::Ip,
        }
    }

    fn describe(self) -> &'static str {
        match self {
            Self::Domain => "domains",
            Self::SourceProcess => "source process paths",
            Self::DestinationProcess => "destination process paths",
            Self::DestinationPort => "destination ports",
            Self::DestinationIp => "destination IP addresses",
        }
    }

    /// Validate raw values and convert them to filter values.
    pub fn values(self, raw: &[String]) -> Result<Vec<Value>, CoreError> {
        if raw.is_empty() {
            return Err(CoreError::validation(format!(
                "the list of {} was empty",
                self.describe()
            )));
        }
        raw.iter().map(|v| self.value(v.trim())).collect()
    }

    fn value(self, raw: &str) -> Result<Value, CoreError> {
        if raw.is_empty() {
            return Err(CoreError::validation(format!(
                "blank entry in {}",
                self.describe()
            )));
        }
        match self {
            Self::DestinationPort => match raw.parse::<u16>() {
                Ok(port) if port >= 1 => Ok(Value::from(port)),
                _ => Err(CoreError::validation(format!(
                    "invalid port '{raw}': expected an integer between 1 and 65535"
                ))),
            },
            Self::DestinationIp => raw
                .parse::<IpAddr>()
                .map(|ip| Value::from(ip.to_string()))
                .map_err(|_| CoreError::validation(format!("invalid IP address '{raw}'"))),
            Self::Domain | Self::SourceProcess | Self::DestinationProcess => {
                Ok(Value::from(raw))
            }
        }
    }
}

/// Build the `_filters` set for a field search plus any catalog-known extras.
pub fn field_filters(
    field: HuntField,
    raw_values: &[String],
    query: &HuntQuery,
    catalog: &NetworkFilterCatalog,
) -> Result<FilterSet, CoreError> {
    let values = field.values(raw_values)?;
    let mut set = FilterSet::new().with(FilterExpr::include(field.filter_id(), values)?);
    for clause in query.extra_clauses(catalog)? {
        set.push(clause);
    }
    Ok(set)
}

/// Fetch every activity whose `field` matches one of `raw_values`.
pub async fn hunt_field(
    client: &ZnClient,
    catalog: &NetworkFilterCatalog,
    field: HuntField,
    raw_values: &[String],
    query: &HuntQuery,
) -> Result<Vec<NetworkActivity>, CoreError> {
    let filters = field_filters(field, raw_values, query, catalog)?;
    let mut params = query.to_query();
    filters.apply(&mut params)?;
    let activities = client.list_network_activities(&params, query.limit).await?;
    info!(
        field = %field,
        values = raw_values.len(),
        found = activities.len(),
        "field hunt complete"
    );
    Ok(activities)
}
