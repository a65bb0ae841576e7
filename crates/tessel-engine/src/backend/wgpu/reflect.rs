//! Resource-binding scan of WGSL source.
//!
//! Only module-scope `@group(g) @binding(b) var ...` declarations matter here;
//! the shader compiler has already validated the source, so the scan stays
//! shallow.

/// What a binding holds.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BindingKind {
    /// `var<uniform>` of type `mat3x3<f32>`.
    Mat3,
    /// `var<uniform>` of type `vec4<f32>`.
    Vec4,
    /// `var<uniform>` of type `f32`.
    Float,
    /// `var<uniform>` of type `i32` or `u32`.
    Int,
    /// `var<uniform>` of a user struct type: a uniform block.
    Block,
    /// `texture_2d<f32>`.
    Texture,
    Sampler,
}

impl BindingKind {
    fn from_decl(address_space: Option<&str>, ty: &str) -> Option<Self> {
        match address_space {
            Some("uniform") => Some(match ty {
                "mat3x3<f32>" | "mat3x3f" => BindingKind::Mat3,
                "vec4<f32>" | "vec4f" => BindingKind::Vec4,
                "f32" => BindingKind::Float,
                "i32" | "u32" => BindingKind::Int,
                _ => BindingKind::Block,
            }),
            Some(_) => None,
            None if ty.starts_with("texture_2d") => Some(BindingKind::Texture),
            None if ty == "sampler" => Some(BindingKind::Sampler),
            None => None,
        }
    }

    /// Bytes a uniform of this kind occupies in a uniform buffer.
    pub fn uniform_size(self) -> Option<u64> {
        match self {
            BindingKind::Mat3 => Some(48),
            BindingKind::Vec4 | BindingKind::Float | BindingKind::Int => Some(16),
            _ => None,
        }
    }
}

/// One module-scope resource binding.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Binding {
    pub name: String,
    pub group: u32,
    pub binding: u32,
    pub kind: BindingKind,
}

/// Lists every resource binding declared in `source`, in declaration order.
pub fn scan_bindings(source: &str) -> Vec<Binding> {
    let stripped = strip_line_comments(source);
    stripped
        .split(';')
        .filter_map(|statement| {
            let start = statement.rfind("@group(")?;
            parse_binding(&statement[start..])
        })
        .collect()
}

fn strip_line_comments(source: &str) -> String {
    source
        .lines()
        .map(|line| match line.find("//") {
            Some(i) => &line[..i],
            None => line,
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parses `@group(g) @binding(b) var<space> name: type`.
fn parse_binding(decl: &str) -> Option<Binding> {
    let group = attribute_value(decl, "@group(")?;
    let binding = attribute_value(decl, "@binding(")?;

    let var_at = decl.find("var")?;
    let rest = decl[var_at + 3..].trim_start();

    let (address_space, rest) = match rest.strip_prefix('<') {
        Some(inner) => {
            let close = inner.find('>')?;
            let space = inner[..close].split(',').next()?.trim();
            (Some(space), &inner[close + 1..])
        }
        None => (None, rest),
    };

    let (name, ty) = rest.split_once(':')?;
    let name = name.trim();
    let ty: String = ty.split_whitespace().collect();
    if name.is_empty() || ty.is_empty() {
        return None;
    }

    let kind = BindingKind::from_decl(address_space, &ty)?;
    Some(Binding {
        name: name.to_string(),
        group,
        binding,
        kind,
    })
}

fn attribute_value(decl: &str, attribute: &str) -> Option<u32> {
    let start = decl.find(attribute)? + attribute.len();
    let end = decl[start..].find(')')?;
    decl[start..start + end].trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::ShaderSource;

    fn find<'a>(bindings: &'a [Binding], name: &str) -> &'a Binding {
        bindings
            .iter()
            .find(|b| b.name == name)
            .unwrap_or_else(|| panic!("binding `{name}` not found"))
    }

    #[test]
    fn scans_quad_vertex_stage() {
        let bindings = scan_bindings(&ShaderSource::quad().vertex);
        assert_eq!(bindings.len(), 4);

        let camera = find(&bindings, "Camera");
        assert_eq!((camera.group, camera.binding, camera.kind), (0, 0, BindingKind::Block));

        let model = find(&bindings, "uModel");
        assert_eq!((model.group, model.binding, model.kind), (1, 0, BindingKind::Mat3));

        assert_eq!(find(&bindings, "u_depth").kind, BindingKind::Float);
    }

    #[test]
    fn scans_quad_fragment_stage() {
        let bindings = scan_bindings(&ShaderSource::quad().fragment);
        let kinds: Vec<_> = bindings.iter().map(|b| (b.name.as_str(), b.kind)).collect();
        assert_eq!(
            kinds,
            [
                ("uTintColor", BindingKind::Vec4),
                ("uTex2d", BindingKind::Texture),
                ("uTex2d_sampler", BindingKind::Sampler),
            ]
        );
    }

    #[test]
    fn ignores_commented_and_non_resource_declarations() {
        let src = "
            // @group(0) @binding(0) var<uniform> Hidden: f32;
            var<private> scratch: f32;
            @group(3) @binding(7) var<uniform> uLevel: i32;
        ";
        let bindings = scan_bindings(src);
        assert_eq!(bindings.len(), 1);
        assert_eq!(bindings[0].name, "uLevel");
        assert_eq!((bindings[0].group, bindings[0].binding), (3, 7));
        assert_eq!(bindings[0].kind, BindingKind::Int);
    }

    #[test]
    fn attributes_may_span_lines() {
        let src = "@group(1)\n@binding(2)\nvar<uniform> tint : vec4<f32>;";
        let bindings = scan_bindings(src);
        assert_eq!(bindings[0].kind, BindingKind::Vec4);
        assert_eq!(bindings[0].name, "tint");
    }
}
