use kube::core::CustomResourceExt;
use tenant_operator::crd::TenantInfo;

fn main() -> anyhow::Result<()> {
    let crd = TenantInfo::crd();
    print!("{}", serde_yaml::to_string(&crd)?);
    Ok(())
}
