// Remote asset catalog over HTTP
use ahash::AHashMap;
use fieldfuse_core::{DataSource, Error, FieldInfo, Result};
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

const SUCCESS: &str = "SUCCESS";

#[derive(Deserialize)]
struct Envelope {
    #[serde(default)]
    message: String,
    #[serde(default)]
    data: Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AssetFields {
    #[serde(default)]
    field_list: Vec<RawField>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawField {
    id: Value,
    #[serde(default)]
    physics_name: String,
    #[serde(default)]
    logic_name: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AssetData {
    #[serde(default)]
    field_name: Vec<String>,
    #[serde(default)]
    asset_data: Vec<Vec<Value>>,
}

/// Textual form of a JSON scalar. Null becomes empty.
fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn unwrap_envelope(body: Value, what: &str) -> Result<Value> {
    let envelope: Envelope = serde_json::from_value(body)?;
    if envelope.message != SUCCESS {
        return Err(Error::DataUnavailable(format!("{}: {}", what, envelope.message)));
    }
    Ok(envelope.data)
}

/// Field list of the first asset in a fields response.
pub fn parse_fields(body: Value, table_id: &str) -> Result<Vec<FieldInfo>> {
    let data = unwrap_envelope(body, table_id)?;
    let assets: Vec<AssetFields> = serde_json::from_value(data)?;
    let asset = assets
        .into_iter()
        .next()
        .ok_or_else(|| Error::DataUnavailable(format!("no field info for asset {}", table_id)))?;
    Ok(asset
        .field_list
        .into_iter()
        .map(|f| FieldInfo::new(text(&f.id), f.physics_name, f.logic_name.unwrap_or_default()))
        .collect())
}

/// Columns of a data response keyed by field id. Columns whose physical
/// name is not among `fields` are dropped.
pub fn parse_table(body: Value, table_id: &str, fields: &[FieldInfo]) -> Result<AHashMap<String, Vec<String>>> {
    let data = unwrap_envelope(body, table_id)?;
    let data: AssetData = serde_json::from_value(data)?;

    let ids: AHashMap<&str, &str> = fields
        .iter()
        .map(|f| (f.physical_name.as_str(), f.field_id.as_str()))
        .collect();

    let mut columns = AHashMap::new();
    for (index, name) in data.field_name.iter().enumerate() {
        let Some(&field_id) = ids.get(name.as_str()) else {
            continue;
        };
        let column = data
            .asset_data
            .iter()
            .map(|row| row.get(index).map(text).unwrap_or_default())
            .collect();
        columns.insert(field_id.to_string(), column);
    }
    Ok(columns)
}

/// Blocking client for the asset catalog endpoints.
pub struct HttpSource {
    client: reqwest::blocking::Client,
    fields_url: String,
    data_url: String,
}

fn remote(e: reqwest::Error) -> Error {
    Error::DataUnavailable(e.to_string())
}

impl HttpSource {
    pub fn new(fields_url: impl Into<String>, data_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .build()
            .map_err(|e| Error::Configuration(format!("cannot build catalog client: {}", e)))?;
        Ok(Self {
            client,
            fields_url: fields_url.into(),
            data_url: data_url.into(),
        })
    }

    fn fetch_data(&self, table_id: &str, limit: Option<usize>) -> Result<Value> {
        info!("Request data info. asset_id: {}", table_id);
        let mut request = self.client.get(&self.data_url).query(&[("asset_id", table_id)]);
        if let Some(limit) = limit {
            request = request.query(&[("limit", limit)]);
        }
        request.send().and_then(|r| r.json()).map_err(remote)
    }
}

impl DataSource for HttpSource {
    fn fetch_fields(&self, table_id: &str) -> Result<Vec<FieldInfo>> {
        info!("Request fields info. assetIds: {}", table_id);
        let body: Value = self
            .client
            .post(&self.fields_url)
            .form(&[("assetIds", table_id)])
            .send()
            .and_then(|r| r.json())
            .map_err(remote)?;
        parse_fields(body, table_id)
    }

    /// Fetches the table once and converts only the requested column.
    /// `FieldCatalog` goes through `fetch_table_values` instead, so a whole
    /// table costs one data request per match job.
    fn fetch_values(&self, table_id: &str, field_id: &str, limit: Option<usize>) -> Result<Vec<String>> {
        let field = self
            .fetch_fields(table_id)?
            .into_iter()
            .find(|f| f.field_id == field_id)
            .ok_or_else(|| Error::DataUnavailable(format!("no field {}/{}", table_id, field_id)))?;
        let body = self.fetch_data(table_id, limit)?;
        parse_table(body, table_id, std::slice::from_ref(&field))?
            .remove(field_id)
            .ok_or_else(|| Error::DataUnavailable(format!("no data for field {}/{}", table_id, field_id)))
    }

    fn fetch_table_values(&self, table_id: &str, limit: Option<usize>) -> Result<AHashMap<String, Vec<String>>> {
        let fields = self.fetch_fields(table_id)?;
        let body = self.fetch_data(table_id, limit)?;
        parse_table(body, table_id, &fields)
    }
}
