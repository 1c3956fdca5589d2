//! From transactions to test cases: grouping, resource partitioning, naming,
//! and expected-output derivation.

pub mod case;
pub mod group;
pub mod naming;
pub mod resource;

pub use case::{synthesize, Expected, ExpectedBody, TestCase};
pub use group::{group, BodySignature, EndpointGroup, EndpointGroups, Signature};
pub use naming::test_name;
pub use resource::{partition, resource_name};
