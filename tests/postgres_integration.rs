use telemetry_api::config::DatabaseConfig;
use telemetry_api::domain::LATEST_LIMIT;
use telemetry_api::{
    ensure_schema, NewReading, PostgresClient, PostgresTelemetryStore, StoreError, TelemetryStore,
};
use testcontainers::runners::AsyncRunner;
use testcontainers::ContainerAsync;
use testcontainers_modules::postgres::Postgres;

async fn start_store() -> (ContainerAsync<Postgres>, PostgresClient, PostgresTelemetryStore) {
    let postgres = Postgres::default().start().await.unwrap();
    let host = postgres.get_host().await.unwrap();
    let port = postgres.get_host_port_ipv4(5432).await.unwrap();

    let config = DatabaseConfig {
        host: host.to_string(),
        port,
        name: "postgres".to_string(),
        user: Some("postgres".to_string()),
        password: Some("postgres".to_string()),
        max_pool_size: 5,
        ..DatabaseConfig::default()
    };
    let client = PostgresClient::new(&config).unwrap();
    client.ping().await.unwrap();
    ensure_schema(&client).await.unwrap();

    let store = PostgresTelemetryStore::new(client.clone());
    (postgres, client, store)
}

fn reading(temperature: f64, humidity: f64, pressure: f64, sensor_id: &str) -> NewReading {
    NewReading {
        temperature: Some(temperature),
        humidity: Some(humidity),
        pressure: Some(pressure),
        sensor_id: Some(sensor_id.to_string()),
    }
}

#[tokio::test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
async fn test_schema_bootstrap_is_idempotent() {
    let (_postgres, client, store) = start_store().await;

    ensure_schema(&client).await.unwrap();
    ensure_schema(&client).await.unwrap();

    assert_eq!(store.stats().await.unwrap().total_records, 0);
}

#[tokio::test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
async fn test_insert_and_read_back() {
    let (_postgres, _client, store) = start_store().await;

    let inserted = store
        .insert(reading(21.5, 40.0, 1013.2, "s1"))
        .await
        .unwrap();
    assert_eq!(inserted.id, 1);

    let latest = store.latest(LATEST_LIMIT).await.unwrap();
    assert_eq!(latest.len(), 1);
    let first = &latest[0];
    assert_eq!(first.id, 1);
    assert_eq!(first.timestamp, Some(inserted.timestamp));
    assert_eq!(first.temperature, Some(21.5));
    assert_eq!(first.humidity, Some(40.0));
    assert_eq!(first.pressure, Some(1013.2));
    assert_eq!(first.sensor_id.as_deref(), Some("s1"));
}

#[tokio::test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
async fn test_default_sensor_id_and_monotonic_ids() {
    let (_postgres, _client, store) = start_store().await;

    let mut last_id = 0;
    for _ in 0..3 {
        let inserted = store.insert(NewReading::default()).await.unwrap();
        assert!(inserted.id > last_id);
        last_id = inserted.id;
    }

    let latest = store.latest(LATEST_LIMIT).await.unwrap();
    assert!(latest
        .iter()
        .all(|r| r.sensor_id.as_deref() == Some("default") && r.temperature.is_none()));
}

#[tokio::test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
async fn test_explicit_null_sensor_id_is_stored_as_null() {
    let (_postgres, _client, store) = start_store().await;

    let body: NewReading = serde_json::from_str(r#"{"temperature": 19.0, "sensor_id": null}"#)
        .unwrap();
    store.insert(body).await.unwrap();

    let latest = store.latest(LATEST_LIMIT).await.unwrap();
    assert_eq!(latest[0].sensor_id, None);
    assert_eq!(latest[0].temperature, Some(19.0));
}

#[tokio::test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
async fn test_latest_is_limited_and_ordered() {
    let (_postgres, _client, store) = start_store().await;

    for i in 0..15 {
        store
            .insert(reading(i as f64, 50.0, 1000.0, "s1"))
            .await
            .unwrap();
    }

    let latest = store.latest(LATEST_LIMIT).await.unwrap();
    assert_eq!(latest.len(), 10);
    assert_eq!(latest[0].id, 15);
    for pair in latest.windows(2) {
        assert!(pair[0].timestamp >= pair[1].timestamp);
    }
}

#[tokio::test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
async fn test_stats() {
    let (_postgres, _client, store) = start_store().await;

    let empty = store.stats().await.unwrap();
    assert_eq!(empty.total_records, 0);
    assert_eq!(empty.avg_temperature, None);
    assert_eq!(empty.avg_humidity, None);
    assert_eq!(empty.avg_pressure, None);
    assert_eq!(empty.latest_timestamp, None);

    store.insert(reading(20.0, 40.0, 1000.0, "a")).await.unwrap();
    store.insert(reading(21.0, 41.0, 1001.0, "b")).await.unwrap();
    let last = store
        .insert(NewReading {
            temperature: Some(21.0),
            ..NewReading::default()
        })
        .await
        .unwrap();

    let stats = store.stats().await.unwrap();
    assert_eq!(stats.total_records, 3);
    assert_eq!(stats.avg_temperature, Some(20.67));
    assert_eq!(stats.avg_humidity, Some(40.5));
    assert_eq!(stats.avg_pressure, Some(1000.5));
    assert_eq!(stats.latest_timestamp, Some(last.timestamp));
}

#[tokio::test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
async fn test_overlong_sensor_id_is_query_error() {
    let (_postgres, _client, store) = start_store().await;

    let err = store
        .insert(NewReading {
            sensor_id: Some("x".repeat(51)),
            ..NewReading::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Query(_)));
}

#[tokio::test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
async fn test_missing_table_is_query_error() {
    let (_postgres, client, store) = start_store().await;

    client
        .get_connection()
        .await
        .unwrap()
        .batch_execute("DROP TABLE sensor_data")
        .await
        .unwrap();

    assert!(matches!(store.latest(LATEST_LIMIT).await, Err(StoreError::Query(_))));
    assert!(matches!(store.stats().await, Err(StoreError::Query(_))));
}
