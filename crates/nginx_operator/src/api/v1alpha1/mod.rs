pub mod nginxoperator;

pub const API_GROUP: &str = "operator.example.com";
pub const API_VERSION: &str = "operator.example.com/v1alpha1";
