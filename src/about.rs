pub const MSA_REUSE_DISPLAY_VERSION: &str = env!("MSA_REUSE_DISPLAY_VERSION");
pub const MSA_REUSE_BUILD_N: &str = env!("MSA_REUSE_BUILD_N");

pub fn version_cli_text() -> String {
    format!(
        "msa_reuse {}\nBuild {}\nAlignment reuse and triage for AlphaFold3 job batches",
        MSA_REUSE_DISPLAY_VERSION, MSA_REUSE_BUILD_N
    )
}
