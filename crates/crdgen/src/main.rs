use kube::CustomResourceExt as _;
use nginx_operator::api::v1alpha1::nginxoperator::NginxOperator;

fn main() -> anyhow::Result<()> {
    print!("{}", serde_yaml::to_string(&NginxOperator::crd())?);
    Ok(())
}
