use std::env;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct OutputConfig {
    pub pretty: bool,
}

impl OutputConfig {
    /// SUBSYNC_OUTPUT_PRETTY=1|true|yes indents the envelope.
    pub fn from_env() -> Self {
        OutputConfig { pretty: parse_flag(env::var("SUBSYNC_OUTPUT_PRETTY").ok().as_deref()) }
    }
}

fn parse_flag(v: Option<&str>) -> bool {
    matches!(v, Some(v) if v.eq_ignore_ascii_case("1") || v.eq_ignore_ascii_case("true") || v.eq_ignore_ascii_case("yes"))
}
