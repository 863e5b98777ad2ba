//! NetBox query executor
//!
//! Runs the paginated lookup for a category and extracts one flat record
//! per matched VRF or device. Transport failures end the pagination early
//! and keep whatever was collected; malformed payloads are errors.

use serde_json::{Map, Value};

use super::transport::SharedTransport;
use crate::config::{EnrichSettings, NETBOX_URL_SUFFIX};
use crate::error::{EnrichError, Result, TransportError};
use crate::lookup::LookupType;
use crate::normalize::{dedup_records, name_or_display, ExtractedRecord};

const PREFIXES_PATH: &str = "ipam/prefixes/";
const IP_ADDRESSES_PATH: &str = "ipam/ip-addresses/";

pub struct QueryExecutor {
    transport: SharedTransport,
    page_size: usize,
    verbose: bool,
    url_base: String,
}

impl QueryExecutor {
    pub fn new(
        transport: SharedTransport,
        page_size: usize,
        verbose: bool,
        url_base: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            page_size: page_size.max(1),
            verbose,
            url_base: url_base.into(),
        }
    }

    pub fn from_settings(transport: SharedTransport, settings: &EnrichSettings) -> Self {
        Self::new(
            transport,
            settings.page_size,
            settings.verbose,
            settings.url_base.clone(),
        )
    }

    /// Run the lookup for `key`.
    ///
    /// Returns `None` for categories without a query. Records are
    /// deduplicated, first occurrence wins.
    pub async fn fetch(&self, lookup: LookupType, key: &str) -> Result<Option<Vec<ExtractedRecord>>> {
        let records = match lookup {
            LookupType::IpVrf => self.fetch_vrfs(key).await?,
            LookupType::IpDevice => self.fetch_devices(key).await?,
            LookupType::MacDevice => {
                tracing::debug!(lookup_type = %lookup, key, "No query for lookup type");
                return Ok(None);
            }
        };
        Ok(Some(dedup_records(records)))
    }

    /// VRFs of the prefixes containing `key`
    async fn fetch_vrfs(&self, key: &str) -> Result<Vec<ExtractedRecord>> {
        let mut vrfs = Vec::new();
        let mut pager = Pager::new(self, PREFIXES_PATH, "contains", key);

        while let Some(prefixes) = pager.next_page().await? {
            for prefix in prefixes {
                if let Some(record) = self.extract_vrf(&prefix)? {
                    vrfs.push(record);
                }
            }
        }

        tracing::debug!(key, count = vrfs.len(), "Collected VRFs");
        Ok(vrfs)
    }

    /// Devices and virtual machines `key` is assigned to
    async fn fetch_devices(&self, key: &str) -> Result<Vec<ExtractedRecord>> {
        let mut devices = Vec::new();
        let mut pager = Pager::new(self, IP_ADDRESSES_PATH, "address", key);

        while let Some(addresses) = pager.next_page().await? {
            for address in addresses {
                let Some(reference) = assigned_device(&address)? else {
                    continue;
                };
                let device = match self.resolve_device(reference).await {
                    Ok(device) => device,
                    Err(e) => {
                        tracing::warn!(key, error = %e, "Device lookup failed, keeping partial results");
                        return Ok(devices);
                    }
                };
                devices.push(self.extract_device(&device)?);
            }
        }

        tracing::debug!(key, count = devices.len(), "Collected devices");
        Ok(devices)
    }

    fn extract_vrf(&self, prefix: &Value) -> Result<Option<ExtractedRecord>> {
        let Value::Object(prefix_obj) = prefix else {
            return Err(EnrichError::malformed("prefix result is not an object"));
        };
        let vrf = match prefix_obj.get("vrf") {
            None | Some(Value::Null) => return Ok(None),
            Some(vrf @ Value::Object(_)) => vrf,
            Some(_) => return Err(EnrichError::malformed("prefix vrf is not an object")),
        };

        let mut record = ExtractedRecord::new();
        record.insert("name".into(), or_null(name_or_display(vrf)));
        record.insert("id".into(), or_null(vrf.get("id")));
        record.insert("site".into(), nested_name(prefix, "site"));
        record.insert("tenant".into(), nested_name(prefix, "tenant"));
        record.insert(
            "url".into(),
            or_null(present(prefix, "url").or_else(|| present(vrf, "url"))),
        );

        if self.verbose {
            let mut details = vrf.as_object().cloned().unwrap_or_default();
            let prefix_only: Map<String, Value> = prefix_obj
                .iter()
                .filter(|(k, _)| k.as_str() != "vrf")
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            details.insert("prefix".into(), Value::Object(prefix_only));
            record.insert("details".into(), Value::Object(details));
        }

        Ok(Some(record))
    }

    fn extract_device(&self, device: &Value) -> Result<ExtractedRecord> {
        if !device.is_object() {
            return Err(EnrichError::malformed("device is not an object"));
        }

        let role = present(device, "role").or_else(|| present(device, "device_role"));
        let manufacturer = device
            .get("device_type")
            .and_then(|device_type| device_type.get("manufacturer"));

        let mut record = ExtractedRecord::new();
        record.insert("name".into(), or_null(name_or_display(device)));
        record.insert("id".into(), or_null(device.get("id")));
        record.insert("url".into(), or_null(device.get("url")));
        record.insert("site".into(), nested_name(device, "site"));
        record.insert("role".into(), or_null(role.and_then(name_or_display)));
        record.insert("cluster".into(), nested_name(device, "cluster"));
        record.insert("device_type".into(), nested_name(device, "device_type"));
        record.insert(
            "manufacturer".into(),
            or_null(manufacturer.and_then(name_or_display)),
        );

        if self.verbose {
            record.insert("details".into(), device.clone());
        }

        Ok(record)
    }

    /// Follow a device reference's own URL to the full object
    async fn resolve_device(
        &self,
        reference: Value,
    ) -> std::result::Result<Value, TransportError> {
        let Some(url) = reference.get("url").and_then(Value::as_str) else {
            return Ok(reference);
        };

        let path = self.api_path(url);
        tracing::debug!(path = %path, "Fetching full device");
        let full = self.transport.get(&path, &[]).await?;
        Ok(if full.is_null() { reference } else { full })
    }

    /// Object URL relative to the API root
    fn api_path<'a>(&self, url: &'a str) -> &'a str {
        let url = url.strip_prefix(self.url_base.as_str()).unwrap_or(url);
        let url = url.strip_prefix(NETBOX_URL_SUFFIX).unwrap_or(url);
        url.strip_prefix('/').unwrap_or(url)
    }
}

/// Offset/limit pagination over one collection endpoint
struct Pager<'a> {
    executor: &'a QueryExecutor,
    path: &'static str,
    filter: &'static str,
    key: &'a str,
    offset: usize,
    done: bool,
}

impl<'a> Pager<'a> {
    fn new(executor: &'a QueryExecutor, path: &'static str, filter: &'static str, key: &'a str) -> Self {
        Self {
            executor,
            path,
            filter,
            key,
            offset: 0,
            done: false,
        }
    }

    /// The next page of results, or `None` once pagination has ended
    async fn next_page(&mut self) -> Result<Option<Vec<Value>>> {
        if self.done {
            return Ok(None);
        }

        let page_size = self.executor.page_size;
        let query = [
            (self.filter, self.key.to_string()),
            ("offset", self.offset.to_string()),
            ("limit", page_size.to_string()),
        ];

        let response = match self.executor.transport.get(self.path, &query).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(
                    path = self.path,
                    key = self.key,
                    offset = self.offset,
                    error = %e,
                    "NetBox query failed, keeping partial results"
                );
                self.done = true;
                return Ok(None);
            }
        };

        let Value::Object(mut body) = response else {
            tracing::debug!(path = self.path, "Response is not a paged object");
            self.done = true;
            return Ok(None);
        };

        let results = match body.remove("results") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items,
            Some(_) => {
                return Err(EnrichError::malformed(format!(
                    "{} results is not a list",
                    self.path
                )))
            }
        };

        tracing::debug!(
            path = self.path,
            offset = self.offset,
            count = results.len(),
            "Fetched page"
        );

        self.offset += results.len();
        if results.len() < page_size {
            self.done = true;
        }
        Ok(Some(results))
    }
}

/// The device or virtual machine an IP address result is assigned to
fn assigned_device(address: &Value) -> Result<Option<Value>> {
    let Value::Object(address) = address else {
        return Err(EnrichError::malformed("ip address result is not an object"));
    };
    let assigned = match address.get("assigned_object") {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Object(assigned)) => assigned,
        Some(_) => return Err(EnrichError::malformed("assigned_object is not an object")),
    };

    let reference = ["device", "virtual_machine"]
        .into_iter()
        .find_map(|field| assigned.get(field).filter(|v| !v.is_null()));

    match reference {
        None => Ok(None),
        Some(device @ Value::Object(_)) => Ok(Some(device.clone())),
        Some(_) => Err(EnrichError::malformed("assigned device is not an object")),
    }
}

/// A member that is present and non-null
fn present<'v>(obj: &'v Value, field: &str) -> Option<&'v Value> {
    obj.get(field).filter(|v| !v.is_null())
}

fn nested_name(obj: &Value, field: &str) -> Value {
    or_null(obj.get(field).and_then(name_or_display))
}

fn or_null(value: Option<&Value>) -> Value {
    value.cloned().unwrap_or(Value::Null)
}
