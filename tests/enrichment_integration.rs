//! End-to-end enrichment against an in-memory NetBox

mod helpers;

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};

use helpers::*;
use netbox_enrich::{
    EnrichError, EnrichOutcome, EnrichmentGate, LookupType, NetboxEnrichmentService,
};

fn device_netbox() -> Arc<MockNetbox> {
    MockNetbox::new(|path, query| match path {
        "ipam/ip-addresses/" => {
            assert_eq!(query_param(query, "address"), Some("10.0.0.5"));
            paged(vec![json!({
                "id": 100,
                "address": "10.0.0.5/24",
                "assigned_object": {
                    "id": 9,
                    "name": "ge-0/0/1",
                    "device": {
                        "id": 5,
                        "name": "sw5",
                        "url": "http://netbox:8080/netbox/api/dcim/devices/5/"
                    }
                }
            })])
        }
        "dcim/devices/5/" => Ok(json!({
            "id": 5,
            "name": "sw5",
            "display": "sw5",
            "url": "http://netbox:8080/netbox/api/dcim/devices/5/",
            "site": {"name": "hq"},
            "role": {"name": "Access Switch"},
            "cluster": null,
            "device_type": {"display": "EX2300", "manufacturer": {"name": "Juniper"}},
            "platform": "Unspecified"
        })),
        other => panic!("unexpected request {other}"),
    })
}

fn device_record() -> Value {
    json!({"destination": {"ip": "10.0.0.5"}})
}

#[tokio::test]
async fn test_device_enrichment() {
    let netbox = device_netbox();
    let service = service(&settings(DEVICE_CONFIG), netbox.clone());
    let mut record = device_record();

    let outcome = service.enrich(&mut record).await.unwrap();

    assert_eq!(outcome, EnrichOutcome::Enriched);
    assert_eq!(netbox.paths(), ["ipam/ip-addresses/", "dcim/devices/5/"]);
    assert_eq!(
        record,
        json!({"destination": {
            "ip": "10.0.0.5",
            "device": {
                "name": ["sw5"],
                "id": [5],
                "url": ["/netbox/api/dcim/devices/5/"],
                "site": ["hq"],
                "role": ["Access Switch"],
                "device_type": ["EX2300"],
                "manufacturer": ["Juniper"]
            }
        }})
    );
}

#[tokio::test]
async fn test_verbose_device_details_are_crushed() {
    let netbox = device_netbox();
    let settings = settings(&format!("{DEVICE_CONFIG}verbose: true\n"));
    let service = service(&settings, netbox);
    let mut record = device_record();

    service.enrich(&mut record).await.unwrap();

    let details = &record["destination"]["device"]["details"];
    assert_eq!(details.as_array().unwrap().len(), 1);
    assert_eq!(details[0]["name"], json!("sw5"));
    assert!(details[0].get("cluster").is_none());
    assert!(details[0].get("platform").is_none());
}

#[tokio::test]
async fn test_repeat_lookup_served_from_cache() {
    let netbox = device_netbox();
    let service = service(&settings(DEVICE_CONFIG), netbox.clone());

    let mut first = device_record();
    let mut second = device_record();
    service.enrich(&mut first).await.unwrap();
    service.enrich(&mut second).await.unwrap();

    assert_eq!(netbox.call_count(), 2);
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_lookup_repeated_after_ttl() {
    let netbox = device_netbox();
    let mut settings = settings(DEVICE_CONFIG);
    settings.cache_ttl = Duration::from_millis(100);
    let service = service(&settings, netbox.clone());

    service.enrich(&mut device_record()).await.unwrap();
    assert_eq!(netbox.call_count(), 2);

    tokio::time::sleep(Duration::from_millis(250)).await;
    service.enrich(&mut device_record()).await.unwrap();
    assert_eq!(netbox.call_count(), 4);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_records_share_one_lookup() {
    let netbox = MockNetbox::slow(Duration::from_millis(50), |_, _| {
        paged(vec![json!({"id": 1, "vrf": {"id": 3, "name": "blue"}})])
    });
    let service = Arc::new(service(&settings(VRF_CONFIG), netbox.clone()));

    let handles: Vec<_> = (0..12)
        .map(|_| {
            let service = service.clone();
            tokio::spawn(async move {
                let mut record = json!({"source": {"ip": "10.1.1.1"}});
                service.enrich(&mut record).await.unwrap();
                record
            })
        })
        .collect();

    for handle in handles {
        let record = handle.await.unwrap();
        assert_eq!(record["source"]["segment"]["name"], json!(["blue"]));
    }
    assert_eq!(netbox.call_count(), 1);
}

#[tokio::test]
async fn test_pagination_requests_until_short_page() {
    let netbox = MockNetbox::new(|path, query| {
        assert_eq!(path, "ipam/prefixes/");
        assert_eq!(query_param(query, "limit"), Some("50"));
        let offset: usize = query_param(query, "offset").unwrap().parse().unwrap();
        let size = match offset {
            0 | 50 => 50,
            100 => 30,
            other => panic!("unexpected offset {other}"),
        };
        paged(
            (offset..offset + size)
                .map(|i| json!({"id": i, "vrf": {"id": i, "name": format!("vrf-{i}")}}))
                .collect(),
        )
    });
    let service = service(&settings(VRF_CONFIG), netbox.clone());

    let result = service
        .lookup(LookupType::IpVrf, "10.1.1.1")
        .await
        .unwrap()
        .unwrap();

    assert_eq!(netbox.call_count(), 3);
    assert_eq!(result["name"].as_array().unwrap().len(), 130);
}

#[tokio::test]
async fn test_transport_failure_publishes_partial_results() {
    let netbox = MockNetbox::new(|_, query| match query_param(query, "offset") {
        Some("0") => paged(vec![
            json!({"id": 1, "vrf": {"id": 3, "name": "blue"}, "tenant": {"name": "acme"}}),
            json!({"id": 2, "vrf": {"id": 4, "name": "red"}}),
        ]),
        _ => Err(unavailable()),
    });
    let settings = settings(&format!("{VRF_CONFIG}page_size: 2\n"));
    let service = service(&settings, netbox.clone());
    let mut record = json!({"source": {"ip": "10.1.1.1"}});

    let outcome = service.enrich(&mut record).await.unwrap();

    assert_eq!(outcome, EnrichOutcome::Enriched);
    assert_eq!(netbox.call_count(), 2);
    // tenant is only known for the first VRF, so the lists differ in length
    assert_eq!(
        record["source"]["segment"],
        json!({"name": ["blue", "red"], "id": [3, 4], "tenant": ["acme"]})
    );
}

#[tokio::test]
async fn test_vrf_urls_made_relative() {
    let netbox = MockNetbox::new(|_, _| {
        paged(vec![json!({
            "id": 1,
            "url": "http://netbox:8080/netbox/api/ipam/prefixes/1/",
            "vrf": {"id": 3, "name": "blue"}
        })])
    });
    let service = service(&settings(VRF_CONFIG), netbox);
    let mut record = json!({"source": {"ip": "10.1.1.1"}});

    service.enrich(&mut record).await.unwrap();

    assert_eq!(
        record["source"]["segment"]["url"],
        json!(["/netbox/api/ipam/prefixes/1/"])
    );
}

#[tokio::test]
async fn test_disabled_gate_leaves_record_untouched() {
    let netbox = device_netbox();
    let service = NetboxEnrichmentService::with_transport(
        &settings(DEVICE_CONFIG),
        EnrichmentGate::from_lookup(|_| None),
        netbox.clone(),
    );
    let mut record = device_record();

    let outcome = service.enrich(&mut record).await.unwrap();

    assert_eq!(outcome, EnrichOutcome::Disabled);
    assert_eq!(record, device_record());
    assert_eq!(netbox.call_count(), 0);
}

#[tokio::test]
async fn test_unimplemented_lookup_type_is_a_no_op() {
    let netbox = device_netbox();
    let settings = settings(
        r#"
source: "[source][mac]"
target: "[source][device]"
lookup_type: mac_device
"#,
    );
    let service = service(&settings, netbox.clone());
    let mut record = json!({"source": {"mac": "00:11:22:33:44:55"}});
    let original = record.clone();

    let outcome = service.enrich(&mut record).await.unwrap();

    assert_eq!(outcome, EnrichOutcome::NoResult);
    assert_eq!(record, original);
    assert_eq!(netbox.call_count(), 0);
}

#[tokio::test]
async fn test_missing_options_or_key_skip_enrichment() {
    let netbox = device_netbox();

    let unbound = service(&settings("lookup_type: ip_device\n"), netbox.clone());
    assert!(!unbound.is_enabled());
    assert_eq!(
        unbound.enrich(&mut device_record()).await.unwrap(),
        EnrichOutcome::Skipped
    );

    let unknown_type = service(
        &settings(&DEVICE_CONFIG.replace("ip_device", "ip_site")),
        netbox.clone(),
    );
    assert_eq!(
        unknown_type.enrich(&mut device_record()).await.unwrap(),
        EnrichOutcome::Skipped
    );

    let bound = service(&settings(DEVICE_CONFIG), netbox.clone());
    for mut record in [
        json!({"destination": {"ip": ""}}),
        json!({"destination": {}}),
        json!({"source": {"ip": "10.0.0.5"}}),
    ] {
        let original = record.clone();
        assert_eq!(bound.enrich(&mut record).await.unwrap(), EnrichOutcome::Skipped);
        assert_eq!(record, original);
    }

    assert_eq!(netbox.call_count(), 0);
}

#[tokio::test]
async fn test_empty_lookup_is_cached_and_not_written() {
    let netbox = MockNetbox::new(|_, _| paged(vec![json!({"id": 1, "assigned_object": null})]));
    let service = service(&settings(DEVICE_CONFIG), netbox.clone());

    for _ in 0..2 {
        let mut record = device_record();
        assert_eq!(
            service.enrich(&mut record).await.unwrap(),
            EnrichOutcome::NoResult
        );
        assert_eq!(record, device_record());
    }
    assert_eq!(netbox.call_count(), 1);
}

#[tokio::test]
async fn test_malformed_payload_propagates_and_is_retried() {
    let netbox = MockNetbox::new(|_, _| Ok(json!({"results": [42]})));
    let service = service(&settings(DEVICE_CONFIG), netbox.clone());

    for _ in 0..2 {
        let mut record = device_record();
        let err = service.enrich(&mut record).await.unwrap_err();
        assert!(matches!(err, EnrichError::Lookup(_)));
        assert_eq!(record, device_record());
    }
    assert_eq!(netbox.call_count(), 2);
}
