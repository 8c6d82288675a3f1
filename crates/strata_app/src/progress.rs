use indicatif::ProgressStyle;

/// Progress bar in the style
/// `<prefix> ####.... <pos>/<len> Steps, <message>`
pub fn run_style() -> ProgressStyle {
    ProgressStyle::with_template(
        "{prefix:.bold.dim} {bar:.cyan/blue} {human_pos}/{human_len} Steps, {wide_msg}",
    )
    .unwrap()
}

/// Progress bar in the style
/// `<prefix> . <message>`
pub fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{prefix:.bold.dim} {spinner} {wide_msg}")
        .unwrap()
        .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
}
