// ABOUTME: Defines token bucket wire messages - single and batch requests,
// ABOUTME: their responses, and the admission results returned to callers.

use serde::{Deserialize, Serialize};

use crate::error::ClientError;

/// A request to withdraw tokens from one bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketRequest {
    #[serde(rename = "bucket_family", default)]
    pub family: String,
    #[serde(rename = "bucket", default)]
    pub name: String,
    #[serde(default)]
    pub amount: i64,
    /// Whether the service may grant fewer tokens than requested.
    #[serde(default)]
    pub partial_fulfillment: bool,
}

impl BucketRequest {
    /// Create an all-or-nothing withdrawal of `amount` tokens.
    pub fn new(family: impl Into<String>, name: impl Into<String>, amount: i64) -> Self {
        Self {
            family: family.into(),
            name: name.into(),
            amount,
            partial_fulfillment: false,
        }
    }

    /// Allow or forbid a partial grant.
    pub fn with_partial_fulfillment(mut self, partial: bool) -> Self {
        self.partial_fulfillment = partial;
        self
    }
}

/// Several bucket requests sent in one call.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BatchRequest {
    #[serde(rename = "request", default)]
    pub requests: Vec<BucketRequest>,
    /// Grant atomically across all requests instead of independently.
    #[serde(default)]
    pub require_all: bool,
}

impl BatchRequest {
    /// Create a batch from `requests`.
    pub fn new(requests: Vec<BucketRequest>, require_all: bool) -> Self {
        Self {
            requests,
            require_all,
        }
    }

    /// A batch holding exactly one request, granted independently.
    pub fn single(request: BucketRequest) -> Self {
        Self::new(vec![request], false)
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}

/// Outcome of one bucket request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BucketResponse {
    #[serde(default)]
    pub success: bool,
}

/// Outcomes of a [`BatchRequest`], in request order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BatchResponse {
    #[serde(rename = "response", default)]
    pub responses: Vec<BucketResponse>,
}

impl BatchResponse {
    /// Build a response from a list of grant flags.
    pub fn from_flags(flags: impl IntoIterator<Item = bool>) -> Self {
        Self {
            responses: flags
                .into_iter()
                .map(|success| BucketResponse { success })
                .collect(),
        }
    }

    /// The first outcome, if any.
    pub fn first(&self) -> Option<&BucketResponse> {
        self.responses.first()
    }

    pub fn len(&self) -> usize {
        self.responses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }
}

/// Grant decision for a single bucket request.
///
/// `error` is set when no definitive answer was obtained. In that case
/// `granted` is always `true`: a broken limiter lets traffic through.
#[derive(Debug)]
pub struct Admission {
    pub granted: bool,
    pub error: Option<ClientError>,
}

impl Admission {
    /// A definitive answer from the service.
    pub fn decided(granted: bool) -> Self {
        Self {
            granted,
            error: None,
        }
    }

    /// A grant issued because no usable answer was available.
    pub fn fail_open(error: Option<ClientError>) -> Self {
        Self {
            granted: true,
            error,
        }
    }

    pub fn is_granted(&self) -> bool {
        self.granted
    }

    /// Split into the grant flag and the error, if any.
    pub fn into_parts(self) -> (bool, Option<ClientError>) {
        (self.granted, self.error)
    }
}

/// Per-position grant decisions for a multi-bucket request.
#[derive(Debug)]
pub struct MultiAdmission {
    pub granted: Vec<bool>,
    pub error: Option<ClientError>,
}

impl MultiAdmission {
    /// Grant every one of `len` positions.
    pub fn fail_open(len: usize, error: Option<ClientError>) -> Self {
        Self {
            granted: vec![true; len],
            error,
        }
    }

    /// Whether every position was granted.
    pub fn all_granted(&self) -> bool {
        self.granted.iter().all(|granted| *granted)
    }
}
