//! Platform specific defines to work around driver bugs and detect GLSL features.
use std::collections::BTreeSet;
use std::fmt::Write;

use indoc::indoc;
use serde::Deserialize;

/// Text producing functions describing the target platform.
pub trait PlatformDefines: Send + Sync {
    /// Macros for working around platform specific bugs and limitations.
    fn platform_defines(&self) -> String;

    /// Macros for GLSL version compatibility and feature detection.
    fn version_defines(&self) -> String;
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GpuVendor {
    Apple,
    Nvidia,
    Intel,
    Amd,
    #[default]
    Unknown,
}

/// Optional GLSL ES 1.00 features provided by extensions.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GlslFeature {
    GlslFragDepth,
    GlslDerivatives,
    GlslDrawBuffers,
    GlslTextureLod,
}

#[derive(Debug, PartialEq, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PlatformInfo {
    pub gpu: GpuVendor,
    pub features: BTreeSet<GlslFeature>,
}

impl PlatformDefines for PlatformInfo {
    fn platform_defines(&self) -> String {
        let defines = match self.gpu {
            GpuVendor::Apple => indoc! {"
                #define APPLE_GPU
                // Emulated fp64 arithmetic is optimized out by the driver.
                #define FP64_CODE_ELIMINATION_WORKAROUND 1
                #define FP32_TAN_PRECISION_WORKAROUND 1
                // Intermediate fp32 values may overflow.
                #define FP64_HIGH_BITS_OVERFLOW_WORKAROUND 1
            "},
            GpuVendor::Nvidia => indoc! {"
                #define NVIDIA_GPU
                // Emulated fp64 arithmetic is optimized out by the driver.
                #define FP64_CODE_ELIMINATION_WORKAROUND 1
            "},
            GpuVendor::Intel => indoc! {"
                #define INTEL_GPU
                // Emulated fp64 arithmetic is optimized out by the driver.
                #define FP64_CODE_ELIMINATION_WORKAROUND 1
                // The builtin tan() is not precise enough.
                #define FP32_TAN_PRECISION_WORKAROUND 1
                // Intermediate fp32 values may overflow.
                #define FP64_HIGH_BITS_OVERFLOW_WORKAROUND 1
            "},
            GpuVendor::Amd => indoc! {"
                #define AMD_GPU
            "},
            GpuVendor::Unknown => indoc! {"
                #define DEFAULT_GPU
                // Assume the most restrictive driver behavior.
                #define FP64_CODE_ELIMINATION_WORKAROUND 1
                #define FP32_TAN_PRECISION_WORKAROUND 1
                #define FP64_HIGH_BITS_OVERFLOW_WORKAROUND 1
            "},
        };
        defines.to_string()
    }

    fn version_defines(&self) -> String {
        let mut glsl = indoc! {"
            #if (__VERSION__ > 120)

            # define FEATURE_GLSL_DERIVATIVES
            # define FEATURE_GLSL_DRAW_BUFFERS
            # define FEATURE_GLSL_FRAG_DEPTH
            # define FEATURE_GLSL_TEXTURE_LOD

            #endif // __VERSION
        "}
        .to_string();

        for feature in &self.features {
            let extension = match feature {
                GlslFeature::GlslFragDepth => indoc! {"
                    // gl_FragDepth
                    #ifdef GL_EXT_frag_depth
                    #extension GL_EXT_frag_depth : enable
                    # define FEATURE_GLSL_FRAG_DEPTH
                    # define gl_FragDepth gl_FragDepthEXT
                    #endif
                "},
                GlslFeature::GlslDerivatives => indoc! {"
                    // dFdx, dFdy, and fwidth
                    #ifdef GL_OES_standard_derivatives
                    #extension GL_OES_standard_derivatives : enable
                    # define FEATURE_GLSL_DERIVATIVES
                    #endif
                "},
                GlslFeature::GlslDrawBuffers => indoc! {"
                    // gl_FragData[]
                    #ifdef GL_EXT_draw_buffers
                    #extension GL_EXT_draw_buffers : require
                    # define FEATURE_GLSL_DRAW_BUFFERS
                    #endif
                "},
                GlslFeature::GlslTextureLod => indoc! {"
                    // texture2DLodEXT and textureCubeLodEXT
                    #ifdef GL_EXT_shader_texture_lod
                    #extension GL_EXT_shader_texture_lod : enable
                    # define FEATURE_GLSL_TEXTURE_LOD
                    #endif
                "},
            };
            writeln!(&mut glsl).unwrap();
            glsl.push_str(extension);
        }

        glsl
    }
}
