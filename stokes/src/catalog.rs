/// The full-screen vertex shader shared by every pass.
pub static VERTEX: &str = include_str!(concat!(env!("OUT_DIR"), "/shaders/fluid.vert"));

/// Draws a single constant colour, read from the `c` uniform.
pub static STAMP: &str = include_str!(concat!(env!("OUT_DIR"), "/shaders/stamp.frag"));

/// Static metadata for one pass.
#[derive(Clone, Copy, Debug)]
pub struct PassSpec {
    pub name: &'static str,
    pub fragment: &'static str,
    /// Vocabulary names, which double as the uniform names in `fragment`.
    pub inputs: &'static [&'static str],
    pub output: &'static str,
}

pub static PASSES: [PassSpec; 13] = [
    PassSpec {
        name: "init",
        fragment: include_str!(concat!(env!("OUT_DIR"), "/shaders/init.frag")),
        inputs: &["initial"],
        output: "carrier",
    },
    PassSpec {
        name: "advect",
        fragment: include_str!(concat!(env!("OUT_DIR"), "/shaders/advect.frag")),
        inputs: &["velocity", "carrier", "timestep"],
        output: "carrier_next",
    },
    PassSpec {
        name: "copy-advect",
        fragment: include_str!(concat!(env!("OUT_DIR"), "/shaders/copy_advect.frag")),
        inputs: &["carrier_next"],
        output: "carrier",
    },
    PassSpec {
        name: "advect-velocity",
        fragment: include_str!(concat!(env!("OUT_DIR"), "/shaders/advect_velocity.frag")),
        inputs: &["velocity", "timestep", "dissipation"],
        output: "scratch",
    },
    PassSpec {
        name: "copy-velocity",
        fragment: include_str!(concat!(env!("OUT_DIR"), "/shaders/copy_scratch.frag")),
        inputs: &["scratch"],
        output: "velocity",
    },
    PassSpec {
        name: "jacobi",
        fragment: include_str!(concat!(env!("OUT_DIR"), "/shaders/jacobi.frag")),
        inputs: &["pressure", "divergence", "texel"],
        output: "scratch",
    },
    PassSpec {
        name: "copy-jacobi",
        fragment: include_str!(concat!(env!("OUT_DIR"), "/shaders/copy_scratch.frag")),
        inputs: &["scratch"],
        output: "pressure",
    },
    PassSpec {
        name: "input",
        fragment: include_str!(concat!(env!("OUT_DIR"), "/shaders/input.frag")),
        inputs: &["velocity", "mouse", "last", "radius", "force"],
        output: "scratch",
    },
    PassSpec {
        name: "copy-input",
        fragment: include_str!(concat!(env!("OUT_DIR"), "/shaders/copy_scratch.frag")),
        inputs: &["scratch"],
        output: "velocity",
    },
    PassSpec {
        name: "divergence",
        fragment: include_str!(concat!(env!("OUT_DIR"), "/shaders/divergence.frag")),
        inputs: &["velocity", "texel"],
        output: "divergence",
    },
    PassSpec {
        name: "gradient",
        fragment: include_str!(concat!(env!("OUT_DIR"), "/shaders/gradient.frag")),
        inputs: &["velocity", "pressure", "texel"],
        output: "scratch",
    },
    PassSpec {
        name: "copy-gradient",
        fragment: include_str!(concat!(env!("OUT_DIR"), "/shaders/copy_scratch.frag")),
        inputs: &["scratch"],
        output: "velocity",
    },
    PassSpec {
        name: "final",
        fragment: include_str!(concat!(env!("OUT_DIR"), "/shaders/final.frag")),
        inputs: &["carrier", "velocity", "pressure", "time"],
        output: "screen",
    },
];

pub fn lookup(name: &str) -> Option<&'static PassSpec> {
    PASSES.iter().find(|spec| spec.name == name)
}

/// The GL type of the uniform `name` as declared in `source`, or `None` if
/// it is not declared. Types the solver never binds map to `glow::NONE`.
pub fn declared_type(source: &str, name: &str) -> Option<u32> {
    source.lines().find_map(|line| {
        let declaration = line.trim().strip_prefix("uniform ")?.strip_suffix(';')?;
        let mut words = declaration.split_whitespace();
        let glsl_type = words.next()?;
        if words.next()? != name || words.next().is_some() {
            return None;
        }

        Some(match glsl_type {
            "float" => glow::FLOAT,
            "vec2" => glow::FLOAT_VEC2,
            "vec4" => glow::FLOAT_VEC4,
            "sampler2D" => glow::SAMPLER_2D,
            _ => glow::NONE,
        })
    })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn pass_names_are_unique() {
        for (index, spec) in PASSES.iter().enumerate() {
            assert!(
                PASSES[index + 1..].iter().all(|other| other.name != spec.name),
                "duplicate pass `{}`",
                spec.name
            );
        }
    }

    #[test]
    fn no_pass_reads_its_own_output() {
        for spec in PASSES.iter() {
            assert!(!spec.inputs.contains(&spec.output), "{}", spec.name);
        }
    }

    #[test]
    fn inputs_are_declared_uniforms() {
        for spec in PASSES.iter() {
            for input in spec.inputs {
                assert!(
                    declared_type(spec.fragment, input).is_some(),
                    "`{}` does not declare `{}`",
                    spec.name,
                    input
                );
            }
        }
    }

    #[test]
    fn reads_declared_types() {
        let source = "#version 330\nuniform float timestep;\nuniform vec2 texel;\n  uniform sampler2D velocity;\nuniform int steps;\n";

        assert_eq!(declared_type(source, "timestep"), Some(glow::FLOAT));
        assert_eq!(declared_type(source, "texel"), Some(glow::FLOAT_VEC2));
        assert_eq!(declared_type(source, "velocity"), Some(glow::SAMPLER_2D));
        assert_eq!(declared_type(source, "steps"), Some(glow::NONE));
        assert_eq!(declared_type(source, "tex"), None);
        assert_eq!(declared_type(source, "pressure"), None);
        assert_eq!(declared_type(STAMP, "c"), Some(glow::FLOAT_VEC4));
    }

    #[test]
    fn texel_is_declared_as_a_vector() {
        for spec in PASSES.iter().filter(|spec| spec.inputs.contains(&"texel")) {
            assert_eq!(
                declared_type(spec.fragment, "texel"),
                Some(glow::FLOAT_VEC2),
                "{}",
                spec.name
            );
        }
    }

    #[test]
    fn shaders_are_versioned() {
        assert!(VERTEX.starts_with("#version"));
        assert!(STAMP.starts_with("#version"));
        assert!(PASSES.iter().all(|spec| spec.fragment.starts_with("#version")));
    }

    #[test]
    fn stamps_sample_nothing() {
        assert!(!STAMP.contains("sampler2D"));
        assert!(STAMP.contains("uniform vec4 c;"));
    }

    #[test]
    fn looks_up_by_name() {
        assert_eq!(lookup("jacobi").map(|spec| spec.output), Some("scratch"));
        assert!(lookup("vorticity").is_none());
    }
}
