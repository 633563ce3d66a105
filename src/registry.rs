//! Named shaders and materials.
//!
//! Setup code registers every shader and material under a string key and
//! keeps the returned [`Handle`]. Drawables hold handles, never keys, so a
//! misspelled key fails once during setup instead of every frame.

use std::{collections::HashMap, fmt, hash::Hash, marker::PhantomData};

use thiserror::Error;

use crate::render::{MaterialTextures, ProgramHandle, TextureHandle};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("'{0}' is already registered; use replace to overwrite it")]
    Duplicate(String),
    #[error("nothing is registered under '{0}'")]
    Missing(String),
    #[error("handle {0} does not belong to this registry")]
    UnknownHandle(usize),
    #[error("material '{material}' references an unregistered shader")]
    DanglingShader { material: String },
}

/// Typed index into a [`NamedRegistry`].
pub struct Handle<T> {
    index: usize,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    fn new(index: usize) -> Self {
        Self {
            index,
            _marker: PhantomData,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }
}

// Manual impls: deriving would require `T` itself to be Copy/Eq/...
impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl<T> Eq for Handle<T> {}

impl<T> Hash for Handle<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.index.hash(state);
    }
}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Handle").field(&self.index).finish()
    }
}

/// String-keyed storage that hands out stable handles.
#[derive(Debug)]
pub struct NamedRegistry<T> {
    keys: HashMap<String, usize>,
    entries: Vec<(String, T)>,
}

impl<T> Default for NamedRegistry<T> {
    fn default() -> Self {
        Self {
            keys: HashMap::new(),
            entries: Vec::new(),
        }
    }
}

impl<T> NamedRegistry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, key: &str, value: T) -> Result<Handle<T>, RegistryError> {
        if self.keys.contains_key(key) {
            return Err(RegistryError::Duplicate(key.to_string()));
        }
        Ok(self.insert(key, value))
    }

    /// Stores `value` under `key`, overwriting any previous value in place.
    pub fn replace(&mut self, key: &str, value: T) -> Handle<T> {
        match self.keys.get(key) {
            Some(&index) => {
                log::debug!("replacing registry entry '{}'", key);
                self.entries[index].1 = value;
                Handle::new(index)
            }
            None => self.insert(key, value),
        }
    }

    fn insert(&mut self, key: &str, value: T) -> Handle<T> {
        let index = self.entries.len();
        self.entries.push((key.to_string(), value));
        self.keys.insert(key.to_string(), index);
        Handle::new(index)
    }

    pub fn lookup(&self, key: &str) -> Result<Handle<T>, RegistryError> {
        self.keys
            .get(key)
            .map(|&index| Handle::new(index))
            .ok_or_else(|| RegistryError::Missing(key.to_string()))
    }

    pub fn get(&self, handle: Handle<T>) -> Result<&T, RegistryError> {
        self.entries
            .get(handle.index)
            .map(|(_, value)| value)
            .ok_or(RegistryError::UnknownHandle(handle.index))
    }

    pub fn key(&self, handle: Handle<T>) -> Option<&str> {
        self.entries.get(handle.index).map(|(key, _)| key.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }
}

/// A compiled shader program registered by name.
#[derive(Clone, Debug, PartialEq)]
pub struct Shader {
    pub name: String,
    pub program: ProgramHandle,
}

pub type ShaderHandle = Handle<Shader>;
pub type MaterialHandle = Handle<Material>;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Shading {
    /// A constant RGBA colour.
    Flat([f32; 4]),
    /// Blinn-Phong lighting from the scene light.
    Lit,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Material {
    pub shader: ShaderHandle,
    pub base_texture: Option<TextureHandle>,
    pub second_texture: Option<TextureHandle>,
    pub shading: Shading,
    pub shadow_map: Option<TextureHandle>,
}

impl Material {
    pub fn flat(shader: ShaderHandle, color: [f32; 4]) -> Self {
        Self {
            shader,
            base_texture: None,
            second_texture: None,
            shading: Shading::Flat(color),
            shadow_map: None,
        }
    }

    pub fn lit(shader: ShaderHandle, shadow_map: Option<TextureHandle>) -> Self {
        Self {
            shader,
            base_texture: None,
            second_texture: None,
            shading: Shading::Lit,
            shadow_map,
        }
    }

    pub fn textured(shader: ShaderHandle, texture: TextureHandle) -> Self {
        Self {
            shader,
            base_texture: Some(texture),
            second_texture: None,
            shading: Shading::Flat([1.0; 4]),
            shadow_map: None,
        }
    }

    pub fn with_second_texture(mut self, texture: TextureHandle) -> Self {
        self.second_texture = Some(texture);
        self
    }

    pub fn textures(&self) -> MaterialTextures {
        MaterialTextures {
            base: self.base_texture,
            second: self.second_texture,
            // Only lit materials read the shadow map
            shadow: match self.shading {
                Shading::Lit => self.shadow_map,
                Shading::Flat(_) => None,
            },
        }
    }

    pub fn color(&self) -> [f32; 4] {
        match self.shading {
            Shading::Flat(color) => color,
            Shading::Lit => [1.0; 4],
        }
    }
}

/// Shaders and materials of one scene, built at setup and read during rendering.
#[derive(Debug, Default)]
pub struct Registry {
    pub shaders: NamedRegistry<Shader>,
    pub materials: NamedRegistry<Material>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_shader(
        &mut self,
        name: &str,
        program: ProgramHandle,
    ) -> Result<ShaderHandle, RegistryError> {
        self.shaders.register(
            name,
            Shader {
                name: name.to_string(),
                program,
            },
        )
    }

    pub fn register_material(
        &mut self,
        name: &str,
        material: Material,
    ) -> Result<MaterialHandle, RegistryError> {
        self.materials.register(name, material)
    }

    pub fn material(&self, handle: MaterialHandle) -> Result<&Material, RegistryError> {
        self.materials.get(handle)
    }

    pub fn shader_of(&self, material: &Material) -> Result<&Shader, RegistryError> {
        self.shaders.get(material.shader)
    }

    /// Checks that every material points at a registered shader.
    pub fn validate(&self) -> Result<(), RegistryError> {
        for (key, material) in self.materials.iter() {
            if self.shaders.get(material.shader).is_err() {
                return Err(RegistryError::DanglingShader {
                    material: key.to_string(),
                });
            }
        }
        log::info!(
            "registry holds {} shaders and {} materials",
            self.shaders.len(),
            self.materials.len()
        );
        Ok(())
    }
}
