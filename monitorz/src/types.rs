//! Types that mirror the agent's JSON schema.
//!
//! The agent is loose about its payloads: fields go missing between versions
//! and psutil happily reports `null` for values it could not read. Everything
//! here therefore deserializes leniently; a missing or `null` field becomes
//! its default instead of failing the whole snapshot.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Treat an explicit `null` the same as a missing field.
fn nullable<'de, D, T>(de: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(de)?.unwrap_or_default())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CpuInfo {
    // per-core percentages, in core order
    #[serde(default, deserialize_with = "nullable")]
    pub usage_pct: Vec<f64>,
    #[serde(default)]
    pub physical_cores: Option<u32>,
    #[serde(default)]
    pub total_cores: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryInfo {
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub used: Option<u64>,
    #[serde(default)]
    pub available: Option<u64>,
    #[serde(default)]
    pub used_pct: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiskInfo {
    #[serde(default, deserialize_with = "nullable")]
    pub device: String,
    #[serde(default, deserialize_with = "nullable")]
    pub mountpoint: String,
    #[serde(default)]
    pub fstype: Option<String>,
    #[serde(default)]
    pub used: Option<u64>,
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub free: Option<u64>,
    #[serde(default)]
    pub used_pct: Option<f64>,
}

/// One row of `top_processes`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessSummary {
    #[serde(default, deserialize_with = "nullable")]
    pub pid: u32,
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub cpu_percent: f64,
    #[serde(default, deserialize_with = "nullable")]
    pub memory_percent: f64,
    #[serde(default)]
    pub username: Option<String>,
}

/// One complete payload from `GET /metrics`. Always replaces the previous one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    #[serde(default, deserialize_with = "nullable")]
    pub timestamp: String,
    #[serde(default)]
    pub cpu: Option<CpuInfo>,
    #[serde(default)]
    pub memory: Option<MemoryInfo>,
    #[serde(default, deserialize_with = "nullable")]
    pub disks: Vec<DiskInfo>,
    #[serde(default, deserialize_with = "nullable")]
    pub top_processes: Vec<ProcessSummary>,

    // Opaque blobs, rendered verbatim.
    #[serde(default)]
    pub network: Option<Value>,
    #[serde(default)]
    pub drivers: Option<Value>,
    #[serde(default)]
    pub hw: Option<Value>,
    #[serde(default)]
    pub swap: Option<Value>,
    #[serde(default)]
    pub interfaces: Option<Value>,

    /// Any other top-level keys the agent sent (e.g. `error`, `status`).
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl MetricsSnapshot {
    /// Named opaque sections in display order, skipping the absent ones.
    pub fn raw_sections(&self) -> Vec<(&str, &Value)> {
        let named = [
            ("drivers", self.drivers.as_ref()),
            ("hw", self.hw.as_ref()),
            ("network", self.network.as_ref()),
            ("swap", self.swap.as_ref()),
            ("interfaces", self.interfaces.as_ref()),
        ];
        named
            .into_iter()
            .filter_map(|(k, v)| v.map(|v| (k, v)))
            .chain(self.extra.iter().map(|(k, v)| (k.as_str(), v)))
            .collect()
    }
}

/// Payload of `GET /process/{pid}`: the summary plus the expensive fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessDetail {
    #[serde(default, deserialize_with = "nullable")]
    pub pid: u32,
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub cpu_percent: f64,
    #[serde(default, deserialize_with = "nullable")]
    pub memory_percent: f64,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub threads: Option<u32>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub memory_info: Option<BTreeMap<String, Value>>,
    #[serde(default)]
    pub io_counters: Option<BTreeMap<String, Value>>,
    #[serde(default)]
    pub open_files: Option<Vec<String>>,
    #[serde(default)]
    pub connections: Option<Vec<Value>>,
    #[serde(default)]
    pub error: Option<String>,
}

/// `GET /health` reply.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Health {
    #[serde(default, deserialize_with = "nullable")]
    pub status: String,
    #[serde(default)]
    pub ts: Option<String>,
}

/// Body of `POST /config`; unset fields are left alone by the agent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AgentConfigUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poll_interval: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub push_url: Option<String>,
}

/// `POST /config` reply.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AgentConfig {
    #[serde(default, deserialize_with = "nullable")]
    pub ok: bool,
    #[serde(default)]
    pub poll_interval: Option<u64>,
    #[serde(default)]
    pub push_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_agent_snapshot() {
        let js = r#"{
            "timestamp": "2025-01-02T03:04:05.000000+00:00",
            "hw": {"system": "Linux", "model": null},
            "cpu": {"physical_cores": 4, "total_cores": 8, "usage_pct": [12.5, 3.0]},
            "memory": {"total": 1000, "available": 400, "used": 600, "used_pct": 60.0},
            "swap": {"total": 0, "used": 0, "free": 0, "used_pct": 0.0},
            "disks": [{"device": "/dev/sda1", "mountpoint": "/", "fstype": "ext4",
                       "total": 100, "used": 25, "free": 75, "used_pct": 25.0}],
            "network": {"bytes_sent": 1, "bytes_recv": 2, "packets_sent": 3, "packets_recv": 4},
            "top_processes": [{"pid": 1, "name": "init", "cpu_percent": 0.5,
                               "memory_percent": 0.1, "username": "root"}],
            "drivers": {"summary_lines": 120},
            "interfaces": {"lo": ["127.0.0.1"]}
        }"#;
        let m: MetricsSnapshot = serde_json::from_str(js).unwrap();
        assert_eq!(m.cpu.as_ref().unwrap().usage_pct, vec![12.5, 3.0]);
        assert_eq!(m.memory.as_ref().unwrap().used_pct, Some(60.0));
        assert_eq!(m.disks[0].mountpoint, "/");
        assert_eq!(m.top_processes[0].username.as_deref(), Some("root"));
        assert!(m.extra.is_empty());
        let names: Vec<&str> = m.raw_sections().iter().map(|(k, _)| *k).collect();
        assert_eq!(names, ["drivers", "hw", "network", "swap", "interfaces"]);
    }

    #[test]
    fn tolerates_nulls_and_missing_fields() {
        let js = r#"{"top_processes": [{"pid": 7, "name": null, "cpu_percent": null}],
                     "disks": null, "status": "empty"}"#;
        let m: MetricsSnapshot = serde_json::from_str(js).unwrap();
        assert_eq!(m.timestamp, "");
        assert!(m.cpu.is_none());
        assert!(m.disks.is_empty());
        let p = &m.top_processes[0];
        assert_eq!((p.pid, p.name.as_str(), p.cpu_percent), (7, "", 0.0));
        assert_eq!(m.extra.get("status"), Some(&Value::from("empty")));
    }

    #[test]
    fn detail_error_payload() {
        let d: ProcessDetail =
            serde_json::from_str(r#"{"pid": 99, "error": "no such process"}"#).unwrap();
        assert_eq!(d.pid, 99);
        assert_eq!(d.error.as_deref(), Some("no such process"));
        assert!(d.open_files.is_none());
    }

    #[test]
    fn config_update_skips_unset_fields() {
        let body = AgentConfigUpdate {
            poll_interval: Some(5),
            push_url: None,
        };
        assert_eq!(serde_json::to_string(&body).unwrap(), r#"{"poll_interval":5}"#);
    }
}
