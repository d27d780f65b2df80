//! Bridge doubles shared by the unit tests.

use async_trait::async_trait;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::{
    CollectionPath, Document, Fields, ImageStorage, ListenerRegistration, NetworkInfo,
    NetworkMonitor, NetworkType, RemoteStore, SnapshotListener, StoreQuery,
};
use bytes::Bytes;
use mockall::mock;
use std::sync::Arc;

mock! {
    pub Store {}

    #[async_trait]
    impl RemoteStore for Store {
        async fn query(&self, query: &StoreQuery) -> BridgeResult<Vec<Document>>;
        async fn get(&self, path: &CollectionPath, id: &str) -> BridgeResult<Option<Document>>;
        async fn set(&self, path: &CollectionPath, id: &str, fields: Fields) -> BridgeResult<()>;
        async fn update(&self, path: &CollectionPath, id: &str, patch: Fields) -> BridgeResult<()>;
        async fn delete(&self, path: &CollectionPath, id: &str) -> BridgeResult<()>;
        async fn listen(
            &self,
            query: StoreQuery,
            listener: SnapshotListener,
        ) -> BridgeResult<Box<dyn ListenerRegistration>>;
    }
}

mock! {
    pub Images {}

    #[async_trait]
    impl ImageStorage for Images {
        async fn upload(&self, path: &str, data: Bytes) -> BridgeResult<String>;
        async fn delete(&self, path: &str) -> BridgeResult<()>;
    }
}

mock! {
    pub Network {}

    impl NetworkMonitor for Network {
        fn network_info(&self) -> NetworkInfo;
    }
}

pub fn online() -> Arc<dyn NetworkMonitor> {
    let mut monitor = MockNetwork::new();
    monitor
        .expect_network_info()
        .returning(|| NetworkInfo::connected(NetworkType::WiFi));
    Arc::new(monitor)
}

pub fn offline() -> Arc<dyn NetworkMonitor> {
    let mut monitor = MockNetwork::new();
    monitor
        .expect_network_info()
        .returning(NetworkInfo::disconnected);
    Arc::new(monitor)
}
