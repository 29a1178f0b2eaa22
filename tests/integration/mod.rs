//! Condition and Target lifecycle tests against an in-memory registry.

use lock_patcher::registry::RegistryError;
use lock_patcher::{
    FileRetriever, HashOracle, MemoryOracle, Platform, ProviderAddress, Release, Spec,
    TerraformLock,
};
use std::cell::Cell;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

mod condition;
mod target;

pub const LOCK_FILE: &str = ".terraform.lock.hcl";

pub const KUBERNETES_2_22_0: &[&str] = &[
    "h1:b6Wj111/wsMNg8FrHFXrf4mCZFtSXKHx4JvbZh3YTCY=",
    "zh:1eac662b1f238042b2068401e510f0624efaf51fd6a4dd9c49d710a49d383b61",
    "zh:4c35651603493437b0b13e070148a330c034ac62c8967c2de9da6620b26adca4",
    "zh:50c0e8654efb46e3a3666c638ca2e0c8aec07f985fbc80f9205bed960386dc9b",
    "zh:5f65194ddd6ea7e89b378297d882083a4b84962edb35dd35752f0c7e9d6282a0",
    "zh:6fc0c2d65864324edde4db84f528268065df58229fc3ee321626687b0e603637",
    "zh:73c58d007aba7f67c0aa9029794e10c2517bec565b7cb57d0f5948ea3f30e407",
    "zh:7d6fc9d3c1843baccd2e1fc56317925a2f9df372427d30fcb5052d123adc887a",
    "zh:a0ad9eb863b51586ea306c5f2beef74476c96684aed41a3ee99eb4b6d8898d01",
    "zh:e218fcfbf4994ff741408a023a9d9eb6c697ce9f63ce5540d3b35226d86c963e",
    "zh:f569b65999264a9416862bca5cd2a6177d94ccb0424f3a4ef424428912b9cb3c",
    "zh:f95625f317795f0e38cc6293dd31c85863f4e225209d07d1e233c50d9295083c",
    "zh:f96e0923a632bc430267fe915794972be873887f5e761ed11451d67202e256c8",
];

pub const KUBERNETES_2_23_0: &[&str] = &[
    "h1:xyFc77aYkPoU4Xt1i5t0B1IaS8TbTtp9aCSuQKDayII=",
    "zh:10488a12525ed674359585f83e3ee5e74818b5c98e033798351678b21b2f7d89",
    "zh:1102ba5ca1a595f880e67102bbf999cc8b60203272a078a5b1e896d173f3f34b",
    "zh:1347cf958ed3f3f80b3c7b3e23ddda3d6c6573a81847a8ee92b7df231c238bf6",
    "zh:2cb18e9f5156bc1b1ee6bc580a709f7c2737d142722948f4a6c3c8efe757fa8d",
    "zh:5506aa6f28dcca2a265ccf8e34478b5ec2cb43b867fe6d93b0158f01590fdadd",
    "zh:6217a20686b631b1dcb448ee4bc795747ebc61b56fbe97a1ad51f375ebb0d996",
    "zh:8accf916c00579c22806cb771e8909b349ffb7eb29d9c5468d0a3f3166c7a84a",
    "zh:9379b0b54a0fa030b19c7b9356708ec8489e194c3b5e978df2d31368563308e5",
    "zh:aa99c580890691036c2931841e88e7ee80d59ae52289c8c2c28ea0ac23e31520",
    "zh:c57376d169875990ac68664d227fb69cd0037b92d0eba6921d757c3fd1879080",
    "zh:e6068e3f94f6943b5586557b73f109debe19d1a75ca9273a681d22d1ce066579",
    "zh:f569b65999264a9416862bca5cd2a6177d94ccb0424f3a4ef424428912b9cb3c",
];

const RELEASE_PLATFORMS: &[&str] = &[
    "darwin_amd64",
    "darwin_arm64",
    "freebsd_386",
    "freebsd_amd64",
    "freebsd_arm",
    "linux_386",
    "linux_amd64",
    "linux_arm",
    "linux_arm64",
    "windows_386",
    "windows_amd64",
    "windows_arm64",
];

/// A release whose `linux_amd64` package carries the first hash and whose
/// checksum file lists the rest.
fn release(version: &str, hashes: &[&str]) -> Release {
    let (h1, checksums) = hashes.split_first().expect("h1 hash");
    let release = Release::new().package(Platform::parse("linux_amd64").unwrap(), *h1);
    RELEASE_PLATFORMS
        .iter()
        .zip(checksums.iter())
        .fold(release, |release, (platform, zh)| {
            release.checksum(
                format!("terraform-provider-kubernetes_{version}_{platform}.zip"),
                *zh,
            )
        })
}

pub fn kubernetes_oracle() -> MemoryOracle {
    let kubernetes = ProviderAddress::parse("hashicorp/kubernetes").unwrap();
    MemoryOracle::new()
        .with_release(kubernetes.clone(), "2.22.0", release("2.22.0", KUBERNETES_2_22_0))
        .with_release(kubernetes, "2.23.0", release("2.23.0", KUBERNETES_2_23_0))
}

pub fn strings(hashes: &[&str]) -> Vec<String> {
    hashes.iter().map(|h| h.to_string()).collect()
}

/// Oracle wrapper that counts queries.
pub struct CountingOracle<O> {
    pub inner: O,
    pub calls: Cell<usize>,
}

impl<O> CountingOracle<O> {
    pub fn new(inner: O) -> Self {
        Self {
            inner,
            calls: Cell::new(0),
        }
    }
}

impl<O: HashOracle> HashOracle for CountingOracle<O> {
    fn get_hashes(
        &self,
        address: &ProviderAddress,
        version: &str,
        platforms: &[Platform],
    ) -> Result<Vec<String>, RegistryError> {
        self.calls.set(self.calls.get() + 1);
        self.inner.get_hashes(address, version, platforms)
    }
}

pub fn spec(provider: &str, file: &str) -> Spec {
    Spec {
        file: file.to_string(),
        provider: provider.to_string(),
        platforms: vec!["linux_amd64".to_string()],
        ..Spec::default()
    }
}

pub fn resource<O: HashOracle>(spec: Spec, oracle: O) -> TerraformLock<O> {
    TerraformLock::new(spec, oracle, FileRetriever::local()).expect("valid spec")
}

pub fn fixture() -> String {
    fs::read_to_string("tests/fixtures/terraform.lock.hcl").expect("fixture")
}

pub fn expected() -> String {
    fs::read_to_string("tests/fixtures/terraform.lock.hcl.expected").expect("expected fixture")
}

/// A scratch working directory holding the fixture at each relative path.
pub fn workspace(paths: &[&str]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for path in paths {
        write(dir.path(), path, &fixture());
    }
    dir
}

pub fn write(root: &Path, path: &str, content: &str) {
    let full = root.join(path);
    if let Some(parent) = full.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(full, content).unwrap();
}

pub fn read(root: &Path, path: &str) -> String {
    fs::read_to_string(root.join(path)).unwrap()
}

pub fn workdir(dir: &TempDir) -> String {
    dir.path().to_string_lossy().into_owned()
}
