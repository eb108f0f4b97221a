//! Templates compiled into the crate.

/// Built-in templates as `(file name, source)` pairs.
pub const TEMPLATES: &[(&str, &str)] = &[
    ("blocked.j2", include_str!("../templates/blocked.j2")),
    ("step_1.j2", include_str!("../templates/step_1.j2")),
    ("step_2.j2", include_str!("../templates/step_2.j2")),
    ("step_3.j2", include_str!("../templates/step_3.j2")),
    ("step_4.j2", include_str!("../templates/step_4.j2")),
    ("step_5.j2", include_str!("../templates/step_5.j2")),
    ("step_6.j2", include_str!("../templates/step_6.j2")),
    ("step_7.j2", include_str!("../templates/step_7.j2")),
    ("step_8.j2", include_str!("../templates/step_8.j2")),
    ("step_9.j2", include_str!("../templates/step_9.j2")),
    ("step_10.j2", include_str!("../templates/step_10.j2")),
    ("step_11.j2", include_str!("../templates/step_11.j2")),
    ("step_12.j2", include_str!("../templates/step_12.j2")),
    ("step_13.j2", include_str!("../templates/step_13.j2")),
    ("step_15.j2", include_str!("../templates/step_15.j2")),
    ("step_16.j2", include_str!("../templates/step_16.j2")),
    ("step_17.j2", include_str!("../templates/step_17.j2")),
    ("step_18.j2", include_str!("../templates/step_18.j2")),
    ("step_19.j2", include_str!("../templates/step_19.j2")),
    ("step_20.j2", include_str!("../templates/step_20.j2")),
    ("step_21.j2", include_str!("../templates/step_21.j2")),
];

/// Looks up a built-in template source by file name.
pub fn lookup(name: &str) -> Option<&'static str> {
    TEMPLATES
        .iter()
        .find(|(file, _)| *file == name)
        .map(|(_, source)| *source)
}
