//! Request/response decorators
//!
//! An option is a small tagged value with two hooks: [`Decorator::before`]
//! rewrites the outgoing request, [`Decorator::after`] post-processes the
//! response. Options compose by folding the caller's list in order.
//!
//! ```ignore
//! map.put("k", b"v".to_vec(), &[with_version(3)]).await?;
//! let entry = map.get("missing", &[with_default(b"fallback".to_vec())]).await?;
//! let events = set.watch(&[with_replay()]).await?;
//! ```

use strata_protocol::{indexed_map, map, value, Replayable};

/// Two-hook request/response decorator
pub trait Decorator<Req, Resp> {
    /// Mutate the outgoing request
    fn before(&self, request: Req) -> Req {
        request
    }

    /// Interpret the incoming response
    fn after(&self, response: Resp) -> Resp {
        response
    }
}

/// Apply every option's `before` hook, in order
pub fn decorate_request<Req, Resp, D>(options: &[D], request: Req) -> Req
where
    D: Decorator<Req, Resp>,
{
    options
        .iter()
        .fold(request, |request, option| option.before(request))
}

/// Apply every option's `after` hook, in order
pub fn decorate_response<Req, Resp, D>(options: &[D], response: Resp) -> Resp
where
    D: Decorator<Req, Resp>,
{
    options
        .iter()
        .fold(response, |response, option| option.after(response))
}

/// A required version, converted into whichever option the call takes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Version(pub u64);

/// Require the current version to match
pub fn with_version<T: From<Version>>(version: u64) -> T {
    T::from(Version(version))
}

/// Return `value` when the key is absent
pub fn with_default(value: impl Into<Vec<u8>>) -> GetOption {
    GetOption::Default(value.into())
}

/// Deliver the current state before live events
pub fn with_replay() -> WatchOption {
    WatchOption::Replay
}

// ----------------------------------------------------------------------------
// Put
// ----------------------------------------------------------------------------

/// Options of a map put
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PutOption {
    /// Only write if the entry is at this version
    Version(u64),
}

impl From<Version> for PutOption {
    fn from(version: Version) -> Self {
        PutOption::Version(version.0)
    }
}

impl Decorator<map::PutRequest, map::PutResponse> for PutOption {
    fn before(&self, mut request: map::PutRequest) -> map::PutRequest {
        match self {
            PutOption::Version(version) => request.version = *version,
        }
        request
    }
}

impl Decorator<indexed_map::PutRequest, indexed_map::PutResponse> for PutOption {
    fn before(&self, mut request: indexed_map::PutRequest) -> indexed_map::PutRequest {
        match self {
            PutOption::Version(version) => request.version = *version,
        }
        request
    }
}

// ----------------------------------------------------------------------------
// Remove
// ----------------------------------------------------------------------------

/// Options of a map remove
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoveOption {
    /// Only remove if the entry is at this version
    Version(u64),
}

impl From<Version> for RemoveOption {
    fn from(version: Version) -> Self {
        RemoveOption::Version(version.0)
    }
}

impl Decorator<map::RemoveRequest, map::RemoveResponse> for RemoveOption {
    fn before(&self, mut request: map::RemoveRequest) -> map::RemoveRequest {
        match self {
            RemoveOption::Version(version) => request.version = *version,
        }
        request
    }
}

impl Decorator<indexed_map::RemoveRequest, indexed_map::RemoveResponse> for RemoveOption {
    fn before(&self, mut request: indexed_map::RemoveRequest) -> indexed_map::RemoveRequest {
        match self {
            RemoveOption::Version(version) => request.version = *version,
        }
        request
    }
}

// ----------------------------------------------------------------------------
// Get
// ----------------------------------------------------------------------------

/// Options of a map get
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GetOption {
    /// Value to report when the key is absent
    Default(Vec<u8>),
}

impl Decorator<map::GetRequest, map::GetResponse> for GetOption {
    fn after(&self, mut response: map::GetResponse) -> map::GetResponse {
        match self {
            // Version 0 means the key is absent
            GetOption::Default(value) if response.version == 0 => {
                response.value = value.clone();
            }
            GetOption::Default(_) => {}
        }
        response
    }
}

// ----------------------------------------------------------------------------
// Watch
// ----------------------------------------------------------------------------

/// Options of a watch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchOption {
    /// Replay current state first
    Replay,
}

impl<Req: Replayable, Resp> Decorator<Req, Resp> for WatchOption {
    fn before(&self, mut request: Req) -> Req {
        match self {
            WatchOption::Replay => request.set_replay(true),
        }
        request
    }
}

// ----------------------------------------------------------------------------
// Value set
// ----------------------------------------------------------------------------

/// Options of a value set
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetOption {
    /// Only write if the value is at this version
    Version(u64),
}

impl From<Version> for SetOption {
    fn from(version: Version) -> Self {
        SetOption::Version(version.0)
    }
}

impl Decorator<value::SetRequest, value::SetResponse> for SetOption {
    fn before(&self, mut request: value::SetRequest) -> value::SetRequest {
        match self {
            SetOption::Version(version) => request.expect_version = *version,
        }
        request
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_protocol::set;

    #[test]
    fn test_with_version_decorates_put_and_remove() {
        let put = map::PutRequest {
            key: "k".into(),
            value: b"v".to_vec(),
            version: 0,
        };
        let options: Vec<PutOption> = vec![with_version(7)];
        let put = decorate_request::<_, map::PutResponse, _>(&options, put);
        assert_eq!(put.version, 7);

        let remove = map::RemoveRequest {
            key: "k".into(),
            version: 0,
        };
        let options: Vec<RemoveOption> = vec![with_version(9)];
        let remove = decorate_request::<_, map::RemoveResponse, _>(&options, remove);
        assert_eq!(remove.version, 9);
    }

    #[test]
    fn test_with_version_leaves_response_untouched() {
        let response = map::PutResponse {
            status: Default::default(),
            entry: map::Entry {
                key: "k".into(),
                value: b"v".to_vec(),
                version: 3,
            },
            previous: None,
        };
        let options: Vec<PutOption> = vec![with_version(7)];
        let after = decorate_response::<map::PutRequest, _, _>(&options, response.clone());
        assert_eq!(after, response);
    }

    #[test]
    fn test_with_default_applies_only_to_missing_keys() {
        let options = vec![with_default(b"d".to_vec())];
        let missing = map::GetResponse::default();
        let missing = decorate_response::<map::GetRequest, _, _>(&options, missing);
        assert_eq!(missing.value, b"d".to_vec());

        let present = map::GetResponse {
            key: "k".into(),
            value: b"v".to_vec(),
            version: 4,
        };
        let present = decorate_response::<map::GetRequest, _, _>(&options, present);
        assert_eq!(present.value, b"v".to_vec());
    }

    #[test]
    fn test_options_fold_in_order() {
        let options: Vec<PutOption> = vec![with_version(1), with_version(2)];
        let put = map::PutRequest {
            key: "k".into(),
            value: Vec::new(),
            version: 0,
        };
        let put = decorate_request::<_, map::PutResponse, _>(&options, put);
        assert_eq!(put.version, 2);
    }

    #[test]
    fn test_with_replay_sets_flag() {
        let request = set::EventRequest { replay: false };
        let request =
            decorate_request::<_, set::EventResponse, _>(&[with_replay()], request);
        assert!(request.replay);
    }
}
