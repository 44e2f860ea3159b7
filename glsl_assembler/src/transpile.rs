//! Conversion of assembled shaders between GLSL ES 1.00 and GLSL ES 3.00.
//!
//! The conversion only rewrites keywords and builtin names using regular expressions.
//! Shaders using features without an equivalent in the target version are left as is.
use std::sync::LazyLock;

use regex::Regex;

use crate::{error::TranspileError, ShaderStage};

/// Convert an assembled shader `source` to `glsl_version`.
///
/// This is implemented for [GlslTranspiler] and any function or closure with a matching signature.
pub trait Transpile: Send + Sync {
    fn transpile(
        &self,
        source: &str,
        glsl_version: u32,
        stage: ShaderStage,
    ) -> Result<String, TranspileError>;
}

impl<F> Transpile for F
where
    F: Fn(&str, u32, ShaderStage) -> Result<String, TranspileError> + Send + Sync,
{
    fn transpile(
        &self,
        source: &str,
        glsl_version: u32,
        stage: ShaderStage,
    ) -> Result<String, TranspileError> {
        self(source, glsl_version, stage)
    }
}

/// Keyword based conversion between GLSL ES versions `100` and `300`.
#[derive(Debug, Default, Clone, Copy)]
pub struct GlslTranspiler;

impl Transpile for GlslTranspiler {
    fn transpile(
        &self,
        source: &str,
        glsl_version: u32,
        stage: ShaderStage,
    ) -> Result<String, TranspileError> {
        match (glsl_version, stage) {
            (300, ShaderStage::Vertex) => Ok(replace(source, &ES300_VERTEX)),
            (300, ShaderStage::Fragment) => fragment_to_300(source),
            (100, ShaderStage::Vertex) => Ok(replace(source, &ES100_VERTEX)),
            (100, ShaderStage::Fragment) => fragment_to_100(source),
            (version, _) => Err(TranspileError::UnsupportedVersion(version)),
        }
    }
}

const ES100_FRAGMENT_OUTPUT: &str = "gl_FragColor";
const ES300_DEFAULT_FRAGMENT_OUTPUT: &str = "fragmentColor";

struct Replacement {
    regex: Regex,
    replacement: &'static str,
    all: bool,
}

fn first(pattern: &str, replacement: &'static str) -> Replacement {
    Replacement {
        regex: Regex::new(pattern).unwrap(),
        replacement,
        all: false,
    }
}

fn all(pattern: &str, replacement: &'static str) -> Replacement {
    Replacement {
        regex: Regex::new(pattern).unwrap(),
        replacement,
        all: true,
    }
}

// Matches declarations like "in vec2 uv;" or "varying float weights[4];".
fn variable(qualifier: &str, replacement: &'static str) -> Replacement {
    all(
        &format!(r"\b{qualifier}[ \t]+(\w+[ \t]+\w+(\[\w+\])?;)"),
        replacement,
    )
}

fn es300_replacements() -> Vec<Replacement> {
    vec![
        first(r"^(#version[ \t]+(100|300[ \t]+es))?[ \t]*\n", "#version 300 es\n"),
        all(r"\btexture(2D|2DProj|Cube)Lod(EXT)?\(", "textureLod("),
        all(r"\btexture(2D|2DProj|Cube)(EXT)?\(", "texture("),
    ]
}

fn es100_replacements() -> Vec<Replacement> {
    vec![
        first(r"^#version[ \t]+300[ \t]+es", "#version 100"),
        all(r"\btexture(2D|2DProj|Cube)Lod\(", "texture${1}LodEXT("),
        // Overloads can't be distinguished without type information.
        all(r"\btexture\(", "texture2D("),
        all(r"\btextureLod\(", "texture2DLodEXT("),
    ]
}

static ES300_VERTEX: LazyLock<Vec<Replacement>> = LazyLock::new(|| {
    let mut replacements = es300_replacements();
    replacements.push(variable("attribute", "in $1"));
    replacements.push(variable("varying", "out $1"));
    replacements
});

static ES300_FRAGMENT: LazyLock<Vec<Replacement>> = LazyLock::new(|| {
    let mut replacements = es300_replacements();
    replacements.push(variable("varying", "in $1"));
    replacements
});

static ES100_VERTEX: LazyLock<Vec<Replacement>> = LazyLock::new(|| {
    let mut replacements = es100_replacements();
    replacements.push(variable("in", "attribute $1"));
    replacements.push(variable("out", "varying $1"));
    replacements
});

static ES100_FRAGMENT: LazyLock<Vec<Replacement>> = LazyLock::new(|| {
    let mut replacements = es100_replacements();
    replacements.push(variable("in", "varying $1"));
    replacements
});

static ES300_FRAGMENT_OUTPUT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bout[ \t]+vec4[ \t]+(\w+)[ \t]*;\n?").unwrap());

static FLOAT_PRECISION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"precision\s+\w+\s+float\s*;[ \t]*\n?").unwrap());

fn replace(source: &str, replacements: &[Replacement]) -> String {
    let mut source = source.to_string();
    for r in replacements {
        source = if r.all {
            r.regex.replace_all(&source, r.replacement).into_owned()
        } else {
            r.regex.replace(&source, r.replacement).into_owned()
        };
    }
    source
}

fn rename(source: &str, from: &str, to: &str) -> Result<String, TranspileError> {
    let regex = Regex::new(&format!(r"\b{}\b", regex::escape(from)))
        .map_err(|e| TranspileError::Message(e.to_string()))?;
    Ok(regex
        .replace_all(source, regex::NoExpand(to))
        .into_owned())
}

fn fragment_to_300(source: &str) -> Result<String, TranspileError> {
    let source = replace(source, &ES300_FRAGMENT);
    let output = ES300_FRAGMENT_OUTPUT
        .captures(&source)
        .map(|c| c[1].to_string());
    match output {
        Some(output) => rename(&source, ES100_FRAGMENT_OUTPUT, &output),
        None => {
            // Declare the output before any functions that write to it.
            let declaration = format!("out vec4 {ES300_DEFAULT_FRAGMENT_OUTPUT};\n");
            let index = match FLOAT_PRECISION.find(&source) {
                Some(m) => m.end(),
                None => version_line_end(&source),
            };
            let source = format!("{}{declaration}{}", &source[..index], &source[index..]);
            rename(&source, ES100_FRAGMENT_OUTPUT, ES300_DEFAULT_FRAGMENT_OUTPUT)
        }
    }
}

fn version_line_end(source: &str) -> usize {
    if source.starts_with("#version") {
        source.find('\n').map(|i| i + 1).unwrap_or(source.len())
    } else {
        0
    }
}

fn fragment_to_100(source: &str) -> Result<String, TranspileError> {
    let source = replace(source, &ES100_FRAGMENT);
    let output = ES300_FRAGMENT_OUTPUT
        .captures(&source)
        .map(|c| c[1].to_string());
    match output {
        Some(output) => {
            let source = ES300_FRAGMENT_OUTPUT.replace(&source, "").into_owned();
            rename(&source, &output, ES100_FRAGMENT_OUTPUT)
        }
        None => Ok(source),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use indoc::indoc;
    use pretty_assertions::assert_eq;

    #[test]
    fn vertex_300_to_100() {
        let source = indoc! {"
            #version 300 es
            in vec3 positions;
            in vec2 texCoords;
            out vec2 vUV;
            uniform sampler2D heightMap;
            void main() {
              vUV = texCoords;
              float h = textureLod(heightMap, texCoords, 0.0).r;
              gl_Position = vec4(positions.xy, h, 1.0);
            }
        "};
        assert_eq!(
            indoc! {"
                #version 100
                attribute vec3 positions;
                attribute vec2 texCoords;
                varying vec2 vUV;
                uniform sampler2D heightMap;
                void main() {
                  vUV = texCoords;
                  float h = texture2DLodEXT(heightMap, texCoords, 0.0).r;
                  gl_Position = vec4(positions.xy, h, 1.0);
                }
            "},
            GlslTranspiler
                .transpile(source, 100, ShaderStage::Vertex)
                .unwrap()
        );
    }

    #[test]
    fn fragment_300_to_100() {
        let source = indoc! {"
            #version 300 es
            precision highp float;
            in vec2 vUV;
            uniform sampler2D tex;
            out vec4 outColor;
            void main() {
              outColor = texture(tex, vUV);
            }
        "};
        assert_eq!(
            indoc! {"
                #version 100
                precision highp float;
                varying vec2 vUV;
                uniform sampler2D tex;
                void main() {
                  gl_FragColor = texture2D(tex, vUV);
                }
            "},
            GlslTranspiler
                .transpile(source, 100, ShaderStage::Fragment)
                .unwrap()
        );
    }

    #[test]
    fn fragment_100_to_300_default_output() {
        let source = indoc! {"
            #version 100
            varying vec2 vUV;
            uniform sampler2D tex;
            void main() {
              gl_FragColor = texture2D(tex, vUV);
            }
        "};
        assert_eq!(
            indoc! {"
                #version 300 es
                out vec4 fragmentColor;
                in vec2 vUV;
                uniform sampler2D tex;
                void main() {
                  fragmentColor = texture(tex, vUV);
                }
            "},
            GlslTranspiler
                .transpile(source, 300, ShaderStage::Fragment)
                .unwrap()
        );
    }

    #[test]
    fn fragment_100_to_300_output_before_functions() {
        let source = indoc! {"
            #version 100
            precision highp float;
            void FILTER_COLOR() {
              gl_FragColor.a = 0.5;
            }
            void main() {
              gl_FragColor = vec4(1.0);
              FILTER_COLOR();
            }
        "};
        assert_eq!(
            indoc! {"
                #version 300 es
                precision highp float;
                out vec4 fragmentColor;
                void FILTER_COLOR() {
                  fragmentColor.a = 0.5;
                }
                void main() {
                  fragmentColor = vec4(1.0);
                  FILTER_COLOR();
                }
            "},
            GlslTranspiler
                .transpile(source, 300, ShaderStage::Fragment)
                .unwrap()
        );
    }

    #[test]
    fn fragment_300_keeps_declared_output() {
        let source = indoc! {"
            #version 300 es
            out vec4 color;
            void main() {
              color = vec4(1.0);
            }
        "};
        assert_eq!(
            source,
            GlslTranspiler
                .transpile(source, 300, ShaderStage::Fragment)
                .unwrap()
        );
    }

    #[test]
    fn vertex_100_to_300() {
        let source = indoc! {"
            #version 100
            attribute vec3 positions;
            varying vec3 vNormal;
            void main() {}
        "};
        assert_eq!(
            indoc! {"
                #version 300 es
                in vec3 positions;
                out vec3 vNormal;
                void main() {}
            "},
            GlslTranspiler
                .transpile(source, 300, ShaderStage::Vertex)
                .unwrap()
        );
    }

    #[test]
    fn unsupported_version() {
        assert_eq!(
            Err(TranspileError::UnsupportedVersion(450)),
            GlslTranspiler.transpile("", 450, ShaderStage::Vertex)
        );
    }

    #[test]
    fn closure_transpiler() {
        let identity = |source: &str, _: u32, _: ShaderStage| -> Result<String, TranspileError> {
            Ok(source.to_string())
        };
        assert_eq!(
            Ok("void main() {}".to_string()),
            identity.transpile("void main() {}", 100, ShaderStage::Fragment)
        );
    }
}
