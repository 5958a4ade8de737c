//! `qmldir` module descriptor parser.
//!
//! A qmldir is line based: one directive per line, whitespace separated,
//! `#` starts a comment line.

use crate::consts::{IDENTIFIER_REGEX, MODULE_REGEX};
use crate::error::{ErrorKind, Result};
use crate::models::{Component, ModuleImport, Plugin, QmlDir, Script, Version};
use exn::ResultExt;

pub fn parse(text: &str) -> Result<QmlDir> {
    let mut qmldir = QmlDir::default();
    for (index, raw) in text.lines().enumerate() {
        let line = index + 1;
        let raw = raw.trim();
        if raw.is_empty() || raw.starts_with('#') {
            continue;
        }
        let words: Vec<&str> = raw.split_whitespace().collect();
        match words.as_slice() {
            ["module", name] => {
                if qmldir.module.is_some() {
                    exn::bail!(ErrorKind::syntax(line, "only one module directive may be defined"));
                }
                if !MODULE_REGEX.is_match(name) {
                    exn::bail!(ErrorKind::syntax(line, format!("invalid module identifier `{name}`")));
                }
                qmldir.module = Some(name.to_string());
            },
            ["module", ..] => exn::bail!(ErrorKind::syntax(line, "module directive requires one argument")),
            ["plugin", rest @ ..] => qmldir.plugins.push(plugin(rest, false, line)?),
            ["optional", "plugin", rest @ ..] => qmldir.plugins.push(plugin(rest, true, line)?),
            ["classname", name] => qmldir.class_name = Some(name.to_string()),
            ["typeinfo", file] => qmldir.type_infos.push(file.to_string()),
            ["designersupported"] => qmldir.designer_supported = true,
            ["static"] => qmldir.is_static = true,
            ["system"] => qmldir.is_system = true,
            ["prefer", path] => qmldir.prefer = Some(path.to_string()),
            ["linktarget", name] => qmldir.link_target = Some(name.to_string()),
            ["import", rest @ ..] | ["default", "import", rest @ ..] => {
                qmldir.imports.push(module_import(rest, line)?);
            },
            ["optional", "import", rest @ ..] => {
                let mut import = module_import(rest, line)?;
                import.optional = true;
                qmldir.imports.push(import);
            },
            ["depends", rest @ ..] => qmldir.dependencies.push(module_import(rest, line)?),
            ["singleton", name, version, file] => {
                qmldir.components.push(component(name, Some(*version), file, line)?.singleton());
            },
            ["internal", name, file] => qmldir.components.push(component(name, None, file, line)?.internal()),
            ["internal", name, version, file] => {
                qmldir.components.push(component(name, Some(*version), file, line)?.internal());
            },
            [name, version, file] if file.ends_with(".js") || file.ends_with(".mjs") => {
                qmldir.scripts.push(Script {
                    name: name.to_string(),
                    file_name: file.to_string(),
                    version: version_at(version, line)?,
                });
            },
            [name, version, file] => qmldir.components.push(component(name, Some(*version), file, line)?),
            [name, file] => qmldir.components.push(component(name, None, file, line)?),
            [directive, ..] => {
                exn::bail!(ErrorKind::syntax(line, format!("unknown or malformed directive `{directive}`")))
            },
            [] => {},
        }
    }
    Ok(qmldir)
}

fn version_at(version: &str, line: usize) -> Result<Version> {
    Version::parse(version).or_raise(|| ErrorKind::syntax(line, format!("invalid version `{version}`")))
}

fn component(name: &str, version: Option<&str>, file: &str, line: usize) -> Result<Component> {
    if !IDENTIFIER_REGEX.is_match(name) {
        exn::bail!(ErrorKind::syntax(line, format!("invalid type name `{name}`")));
    }
    Ok(Component {
        type_name: name.to_string(),
        file_name: file.to_string(),
        version: version.map(|v| version_at(v, line)).transpose()?.unwrap_or_default(),
        singleton: false,
        internal: false,
    })
}

impl Component {
    fn singleton(mut self) -> Self {
        self.singleton = true;
        self
    }

    fn internal(mut self) -> Self {
        self.internal = true;
        self
    }
}

fn plugin(words: &[&str], optional: bool, line: usize) -> Result<Plugin> {
    match words {
        [name] => Ok(Plugin { name: name.to_string(), path: None, optional }),
        [name, path] => Ok(Plugin {
            name: name.to_string(),
            path: Some(path.to_string()),
            optional,
        }),
        _ => exn::bail!(ErrorKind::syntax(line, "plugin directive requires one or two arguments")),
    }
}

fn module_import(words: &[&str], line: usize) -> Result<ModuleImport> {
    let (module, version) = match words {
        [module] => (*module, None),
        [module, version] => (*module, Some(*version)),
        _ => exn::bail!(ErrorKind::syntax(line, "import directive requires one or two arguments")),
    };
    if !MODULE_REGEX.is_match(module) {
        exn::bail!(ErrorKind::syntax(line, format!("invalid module identifier `{module}`")));
    }
    let mut import = ModuleImport::new(module, Version::NONE);
    match version {
        Some("auto") => import.auto = true,
        Some(version) => import.version = version_at(version, line)?,
        None => {},
    }
    Ok(import)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const CONTROLS: &str = r#"
# Generated by qmltyperegistrar
module QtQuick.Controls.Basic
linktarget Qt6::qtquickcontrols2basicstyleplugin
optional plugin qtquickcontrols2basicstyleplugin
classname QtQuickControls2BasicStylePlugin
typeinfo plugins.qmltypes
depends QtQuick auto
import QtQuick.Controls.impl auto
optional import QtQuick.Templates 6.0
designersupported
Button 2.0 Button.qml
Button 6.0 Button.qml
singleton Palette 6.2 Palette.qml
internal ButtonPanel ButtonPanel.qml
Helpers 1.0 helpers.js
"#;

    #[test]
    fn test_parse_full() {
        let qmldir = parse(CONTROLS).unwrap();
        assert_eq!(qmldir.module.as_deref(), Some("QtQuick.Controls.Basic"));
        assert_eq!(qmldir.link_target.as_deref(), Some("Qt6::qtquickcontrols2basicstyleplugin"));
        assert_eq!(
            qmldir.plugins,
            vec![Plugin {
                name: "qtquickcontrols2basicstyleplugin".into(),
                path: None,
                optional: true,
            }]
        );
        assert_eq!(qmldir.class_name.as_deref(), Some("QtQuickControls2BasicStylePlugin"));
        assert_eq!(qmldir.type_infos, vec!["plugins.qmltypes"]);
        assert!(qmldir.designer_supported);

        assert_eq!(qmldir.dependencies.len(), 1);
        assert!(qmldir.dependencies[0].auto);
        assert_eq!(qmldir.imports.len(), 2);
        assert_eq!(qmldir.imports[0].module, "QtQuick.Controls.impl");
        assert_eq!(qmldir.imports[1].version, Version::new(6, 0));
        assert!(qmldir.imports[1].optional);

        let components: Vec<_> = qmldir
            .components
            .iter()
            .map(|c| (c.type_name.as_str(), c.file_name.as_str(), c.version, c.singleton, c.internal))
            .collect();
        assert_eq!(
            components,
            vec![
                ("Button", "Button.qml", Version::new(2, 0), false, false),
                ("Button", "Button.qml", Version::new(6, 0), false, false),
                ("Palette", "Palette.qml", Version::new(6, 2), true, false),
                ("ButtonPanel", "ButtonPanel.qml", Version::NONE, false, true),
            ]
        );
        assert_eq!(qmldir.scripts.len(), 1);
        assert_eq!(qmldir.scripts[0].file_name, "helpers.js");
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(parse("").unwrap(), QmlDir::default());
        assert_eq!(parse("# only a comment\n\n").unwrap(), QmlDir::default());
    }

    #[rstest]
    #[case("module", 1)]
    #[case("module A\nmodule B", 2)]
    #[case("module Foo\nFoo x.y Foo.qml", 2)]
    #[case("\n\nfrobnicate a b c d", 3)]
    #[case("module 1nvalid", 1)]
    #[case("depends", 1)]
    fn test_parse_errors(#[case] input: &str, #[case] expected_line: usize) {
        let err = parse(input).unwrap_err();
        match &*err {
            ErrorKind::Syntax { line, .. } => assert_eq!(*line, expected_line),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
