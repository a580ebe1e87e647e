pub mod cluster;
pub mod deployment;
pub mod nginxoperator_controller;
