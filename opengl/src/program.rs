//! GLSL program creation and per-draw constant upload

use glow::HasContext;
use vesper_core::graphics::{
    DataType, MAX_TEXTURES, ShaderConstant, ShaderDesc, VertexAttribute, VertexSemantic,
};
use vesper_core::{EngineError, Result};

use crate::convert;

/// Attribute name the vertex shader must declare for `attribute`.
pub fn attribute_name(attribute: &VertexAttribute) -> String {
    let semantic = match attribute.semantic {
        VertexSemantic::Position => "position",
        VertexSemantic::Color => "color",
        VertexSemantic::Normal => "normal",
        VertexSemantic::TexCoord => "texcoord",
        VertexSemantic::BlendIndices => "blend_indices",
        VertexSemantic::BlendWeight => "blend_weight",
    };
    format!("{}{}", semantic, attribute.index)
}

/// One interleaved attribute, resolved for `vertex_attrib_pointer`.
#[derive(Debug, Clone, Copy)]
pub struct AttributeLayout {
    pub location: u32,
    pub components: i32,
    pub ty: u32,
    pub normalized: bool,
    pub offset: i32,
}

/// A uniform slot, `None` when the linker optimized it away.
#[derive(Debug)]
pub struct Uniform {
    pub location: Option<glow::NativeUniformLocation>,
    pub data_type: DataType,
}

#[derive(Debug)]
pub struct GlShader {
    pub program: glow::NativeProgram,
    pub attributes: Vec<AttributeLayout>,
    pub stride: i32,
    pub vertex_uniforms: Vec<Uniform>,
    pub fragment_uniforms: Vec<Uniform>,
}

fn source(bytes: &[u8], stage: &str) -> Result<String> {
    if bytes.is_empty() {
        return Err(EngineError::data(format!("{} shader has no source", stage)));
    }
    String::from_utf8(bytes.to_vec())
        .map_err(|e| EngineError::parse(format!("{} shader is not UTF-8: {}", stage, e)))
}

unsafe fn compile_stage(gl: &glow::Context, kind: u32, src: &str, stage: &str) -> Result<glow::NativeShader> {
    unsafe {
        let shader = gl
            .create_shader(kind)
            .map_err(|e| EngineError::system(format!("create_shader({}) failed: {}", stage, e)))?;
        gl.shader_source(shader, src);
        gl.compile_shader(shader);
        if !gl.get_shader_compile_status(shader) {
            let log = gl.get_shader_info_log(shader);
            gl.delete_shader(shader);
            return Err(EngineError::parse(format!("{} shader failed to compile: {}", stage, log)));
        }
        Ok(shader)
    }
}

fn attribute_layout(desc: &ShaderDesc) -> Result<(Vec<AttributeLayout>, i32)> {
    let mut attributes = Vec::with_capacity(desc.vertex_attributes.len());
    let mut offset = 0;
    for (location, attribute) in desc.vertex_attributes.iter().enumerate() {
        let (components, ty, normalized) = convert::vertex_format(attribute.data_type).ok_or_else(|| {
            EngineError::data(format!(
                "{:?} can't be a vertex attribute ({})",
                attribute.data_type,
                attribute_name(attribute)
            ))
        })?;
        attributes.push(AttributeLayout {
            location: location as u32,
            components,
            ty,
            normalized,
            offset,
        });
        offset += attribute.data_type.size() as i32;
    }
    Ok((attributes, offset))
}

unsafe fn uniforms(gl: &glow::Context, program: glow::NativeProgram, constants: &[ShaderConstant]) -> Vec<Uniform> {
    constants
        .iter()
        .map(|constant| Uniform {
            location: unsafe { gl.get_uniform_location(program, &constant.name) },
            data_type: constant.data_type,
        })
        .collect()
}

/// Compiles and links both stages, binding attributes in layout order.
pub unsafe fn create_shader(gl: &glow::Context, desc: &ShaderDesc) -> Result<GlShader> {
    let vertex_src = source(&desc.vertex_shader, "vertex")?;
    let fragment_src = source(&desc.fragment_shader, "fragment")?;
    let (attributes, stride) = attribute_layout(desc)?;

    unsafe {
        let vs = compile_stage(gl, glow::VERTEX_SHADER, &vertex_src, "vertex")?;
        let fs = match compile_stage(gl, glow::FRAGMENT_SHADER, &fragment_src, "fragment") {
            Ok(fs) => fs,
            Err(e) => {
                gl.delete_shader(vs);
                return Err(e);
            }
        };

        let program = match gl.create_program() {
            Ok(program) => program,
            Err(e) => {
                gl.delete_shader(vs);
                gl.delete_shader(fs);
                return Err(EngineError::system(format!("create_program failed: {}", e)));
            }
        };
        for (layout, attribute) in attributes.iter().zip(&desc.vertex_attributes) {
            gl.bind_attrib_location(program, layout.location, &attribute_name(attribute));
        }
        gl.attach_shader(program, vs);
        gl.attach_shader(program, fs);
        gl.link_program(program);
        gl.detach_shader(program, vs);
        gl.detach_shader(program, fs);
        gl.delete_shader(vs);
        gl.delete_shader(fs);

        if !gl.get_program_link_status(program) {
            let log = gl.get_program_info_log(program);
            gl.delete_program(program);
            return Err(EngineError::parse(format!("shader program failed to link: {}", log)));
        }

        // Sampler uniforms point at fixed units for the life of the program
        gl.use_program(Some(program));
        for unit in 0..MAX_TEXTURES {
            if let Some(location) = gl.get_uniform_location(program, &format!("texture{}", unit)) {
                gl.uniform_1_i32(Some(&location), unit as i32);
            }
        }
        gl.use_program(None);

        Ok(GlShader {
            program,
            attributes,
            stride,
            vertex_uniforms: uniforms(gl, program, &desc.vertex_constants),
            fragment_uniforms: uniforms(gl, program, &desc.fragment_constants),
        })
    }
}

/// Uploads one draw's constants. The program must be in use.
pub unsafe fn upload_constants(gl: &glow::Context, uniforms: &[Uniform], values: &[Vec<f32>]) -> Result<()> {
    if values.len() > uniforms.len() {
        return Err(EngineError::data(format!(
            "{} constants for a shader that declares {}",
            values.len(),
            uniforms.len()
        )));
    }
    for (uniform, value) in uniforms.iter().zip(values) {
        let Some(location) = uniform.location.as_ref() else {
            continue;
        };
        let components = uniform.data_type.components() as usize;
        if value.is_empty() || value.len() % components != 0 {
            return Err(EngineError::data(format!(
                "constant of {} floats doesn't fit {:?}",
                value.len(),
                uniform.data_type
            )));
        }
        unsafe {
            match uniform.data_type {
                DataType::Float => gl.uniform_1_f32_slice(Some(location), value),
                DataType::FloatVector2 => gl.uniform_2_f32_slice(Some(location), value),
                DataType::FloatVector3 => gl.uniform_3_f32_slice(Some(location), value),
                DataType::FloatVector4 | DataType::UnsignedByteVector4Norm => {
                    gl.uniform_4_f32_slice(Some(location), value)
                }
                DataType::FloatMatrix3 => gl.uniform_matrix_3_f32_slice(Some(location), false, value),
                DataType::FloatMatrix4 => gl.uniform_matrix_4_f32_slice(Some(location), false, value),
                DataType::Integer | DataType::IntegerVector4 => {
                    let ints: Vec<i32> = value.iter().map(|v| *v as i32).collect();
                    if uniform.data_type == DataType::Integer {
                        gl.uniform_1_i32_slice(Some(location), &ints);
                    } else {
                        gl.uniform_4_i32_slice(Some(location), &ints);
                    }
                }
            }
        }
    }
    Ok(())
}
