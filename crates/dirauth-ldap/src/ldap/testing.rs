//! In-memory directory for tests
//!
//! Searches return every configured entry regardless of filter; tests assert
//! on the recorded filter text instead.

use crate::ldap::directory::{
    ConnectOptions, DirectoryConnection, DirectoryConnector, DirectoryEntry,
};
use crate::ldap::endpoint::Endpoint;
use async_trait::async_trait;
use dirauth_core::{DirectoryError, SearchScope, RC_INVALID_CREDENTIALS};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    Connect { url: String, options: ConnectOptions },
    Bind { dn: String },
    Search {
        base_dn: String,
        scope: SearchScope,
        filter: String,
        attrs: Vec<String>,
    },
    Unbind,
}

#[derive(Default)]
struct Inner {
    entries: Mutex<Vec<DirectoryEntry>>,
    passwords: Mutex<HashMap<String, String>>,
    connect_error: Mutex<Option<DirectoryError>>,
    bind_error: Mutex<Option<DirectoryError>>,
    search_error: Mutex<Option<DirectoryError>>,
    calls: Mutex<Vec<Call>>,
}

#[derive(Clone, Default)]
pub(crate) struct MockDirectory {
    inner: Arc<Inner>,
}

impl MockDirectory {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_entry(self, entry: DirectoryEntry) -> Self {
        self.inner.entries.lock().unwrap().push(entry);
        self
    }

    pub(crate) fn with_password(self, dn: &str, password: &str) -> Self {
        self.inner
            .passwords
            .lock()
            .unwrap()
            .insert(dn.to_string(), password.to_string());
        self
    }

    pub(crate) fn failing_connect(self, err: DirectoryError) -> Self {
        *self.inner.connect_error.lock().unwrap() = Some(err);
        self
    }

    pub(crate) fn failing_bind(self, err: DirectoryError) -> Self {
        *self.inner.bind_error.lock().unwrap() = Some(err);
        self
    }

    pub(crate) fn failing_search(self, err: DirectoryError) -> Self {
        *self.inner.search_error.lock().unwrap() = Some(err);
        self
    }

    pub(crate) fn connector(&self) -> Arc<dyn DirectoryConnector> {
        Arc::new(self.clone())
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.inner.calls.lock().unwrap().clone()
    }

    pub(crate) fn count(&self, matcher: fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|c| matcher(c)).count()
    }

    pub(crate) fn binds(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Bind { dn } => Some(dn),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn searches(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Search { .. }))
            .collect()
    }

    fn record(&self, call: Call) {
        self.inner.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl DirectoryConnector for MockDirectory {
    async fn connect(
        &self,
        endpoint: &Endpoint,
        options: ConnectOptions,
    ) -> Result<Box<dyn DirectoryConnection>, DirectoryError> {
        self.record(Call::Connect {
            url: endpoint.to_string(),
            options,
        });
        if let Some(err) = self.inner.connect_error.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(Box::new(MockConnection { dir: self.clone() }))
    }
}

struct MockConnection {
    dir: MockDirectory,
}

#[async_trait]
impl DirectoryConnection for MockConnection {
    async fn bind(&mut self, dn: &str, password: &str) -> Result<(), DirectoryError> {
        self.dir.record(Call::Bind { dn: dn.to_string() });
        if let Some(err) = self.dir.inner.bind_error.lock().unwrap().clone() {
            return Err(err);
        }
        match self.dir.inner.passwords.lock().unwrap().get(dn) {
            Some(expected) if expected == password => Ok(()),
            _ => Err(DirectoryError::Protocol {
                rc: RC_INVALID_CREDENTIALS,
                message: "invalid credentials".to_string(),
            }),
        }
    }

    async fn search(
        &mut self,
        base_dn: &str,
        scope: SearchScope,
        filter: &str,
        attrs: &[String],
    ) -> Result<Vec<DirectoryEntry>, DirectoryError> {
        self.dir.record(Call::Search {
            base_dn: base_dn.to_string(),
            scope,
            filter: filter.to_string(),
            attrs: attrs.to_vec(),
        });
        if let Some(err) = self.dir.inner.search_error.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(self.dir.inner.entries.lock().unwrap().clone())
    }

    async fn unbind(&mut self) -> Result<(), DirectoryError> {
        self.dir.record(Call::Unbind);
        Ok(())
    }
}
