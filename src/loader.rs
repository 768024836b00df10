// loader.rs - background decoding of images and glTF models

use anyhow::{anyhow, bail, Context, Result};
use glam::{Mat4, Vec3};
use image::io::Reader as ImageReader;
use image::RgbaImage;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::thread;
use stereo_viewer::fit::Aabb;
use stereo_viewer::mesh::{MeshData, Vertex};
use stereo_viewer::scene::LoadToken;

pub struct ModelPrimitive {
    pub mesh: MeshData,
    pub base_color: RgbaImage,
}

pub struct ModelData {
    pub primitives: Vec<ModelPrimitive>,
    /// Bounds of every primitive in model space, node transforms applied.
    pub bounds: Aabb,
}

pub enum LoadEvent {
    Image { src: String, image: RgbaImage },
    ImageFailed { src: String, error: String },
    Model { token: LoadToken, result: Result<ModelData, String> },
}

/// Resolves media references against a local root, or fetches them over HTTP.
#[derive(Clone)]
pub struct MediaFetcher {
    root: PathBuf,
}

impl MediaFetcher {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn is_remote(src: &str) -> bool {
        src.starts_with("http://") || src.starts_with("https://")
    }

    pub fn local_path(&self, src: &str) -> Option<PathBuf> {
        if Self::is_remote(src) {
            return None;
        }
        let path = Path::new(src);
        Some(if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        })
    }

    fn read(&self, src: &str) -> Result<Vec<u8>> {
        match self.local_path(src) {
            Some(path) => {
                std::fs::read(&path).with_context(|| format!("failed to open {}", path.display()))
            }
            None => {
                let mut response = ureq::get(src)
                    .call()
                    .with_context(|| format!("failed to fetch {src}"))?;
                response
                    .body_mut()
                    .with_config()
                    .limit(u64::MAX)
                    .read_to_vec()
                    .with_context(|| format!("failed to read body of {src}"))
            }
        }
    }
}

pub fn start_load_image(src: String, fetcher: MediaFetcher, tx: Sender<LoadEvent>) {
    thread::spawn(move || {
        log::info!("loading image {src} in background");
        let event = match decode_image(&fetcher, &src) {
            Ok(image) => {
                log::info!("decoded {src}: {}x{}", image.width(), image.height());
                LoadEvent::Image { src, image }
            }
            Err(e) => LoadEvent::ImageFailed {
                src,
                error: format!("{e:#}"),
            },
        };
        if tx.send(event).is_err() {
            log::warn!("render loop gone, dropping decoded image");
        }
    });
}

fn decode_image(fetcher: &MediaFetcher, src: &str) -> Result<RgbaImage> {
    let bytes = fetcher.read(src)?;
    let mut reader = ImageReader::new(Cursor::new(bytes)).with_guessed_format()?;
    reader.no_limits();
    let image = reader.decode().with_context(|| format!("failed to decode {src}"))?;
    Ok(image.to_rgba8())
}

pub fn start_load_model(src: String, token: LoadToken, fetcher: MediaFetcher, tx: Sender<LoadEvent>) {
    thread::spawn(move || {
        log::info!("loading model {src} (load {})", token.0);
        let result = load_model(&fetcher, &src).map_err(|e| format!("{e:#}"));
        if tx.send(LoadEvent::Model { token, result }).is_err() {
            log::warn!("render loop gone, dropping model {src}");
        }
    });
}

fn load_model(fetcher: &MediaFetcher, src: &str) -> Result<ModelData> {
    let (document, buffers, images) = match fetcher.local_path(src) {
        // local import resolves external buffers next to the file
        Some(path) => gltf::import(&path).with_context(|| format!("failed to import {}", path.display()))?,
        None => gltf::import_slice(fetcher.read(src)?).with_context(|| format!("failed to parse {src}"))?,
    };

    let scene = document
        .default_scene()
        .or_else(|| document.scenes().next())
        .ok_or_else(|| anyhow!("{src} has no scene"))?;

    let mut model = ModelData {
        primitives: Vec::new(),
        bounds: Aabb::EMPTY,
    };
    for node in scene.nodes() {
        visit_node(&node, Mat4::IDENTITY, &buffers, &images, &mut model)?;
    }
    if model.primitives.is_empty() {
        log::warn!("{src} contains no triangle meshes");
    }
    Ok(model)
}

fn visit_node(
    node: &gltf::Node<'_>,
    parent: Mat4,
    buffers: &[gltf::buffer::Data],
    images: &[gltf::image::Data],
    model: &mut ModelData,
) -> Result<()> {
    let world = parent * Mat4::from_cols_array_2d(&node.transform().matrix());

    if let Some(mesh) = node.mesh() {
        for primitive in mesh.primitives() {
            if primitive.mode() != gltf::mesh::Mode::Triangles {
                continue;
            }
            let reader = primitive.reader(|b| Some(buffers[b.index()].0.as_slice()));
            let Some(positions) = reader.read_positions() else {
                continue;
            };
            let positions: Vec<Vec3> = positions
                .map(|p| world.transform_point3(Vec3::from(p)))
                .collect();
            let uvs: Vec<[f32; 2]> = reader
                .read_tex_coords(0)
                .map(|t| t.into_f32().collect())
                .unwrap_or_default();
            let indices: Vec<u32> = match reader.read_indices() {
                Some(i) => i.into_u32().collect(),
                None => (0..positions.len() as u32).collect(),
            };
            if indices.iter().any(|&i| i as usize >= positions.len()) {
                bail!("primitive index out of range in mesh {:?}", mesh.name());
            }

            let vertices = positions
                .iter()
                .enumerate()
                .map(|(i, p)| {
                    model.bounds.extend(*p);
                    Vertex {
                        position: p.to_array(),
                        uv: uvs.get(i).copied().unwrap_or([0.0, 0.0]),
                    }
                })
                .collect();

            model.primitives.push(ModelPrimitive {
                mesh: MeshData { vertices, indices },
                base_color: base_color(&primitive.material(), images),
            });
        }
    }

    for child in node.children() {
        visit_node(&child, world, buffers, images, model)?;
    }
    Ok(())
}

fn base_color(material: &gltf::Material<'_>, images: &[gltf::image::Data]) -> RgbaImage {
    let pbr = material.pbr_metallic_roughness();
    let textured = pbr
        .base_color_texture()
        .and_then(|info| images.get(info.texture().source().index()))
        .and_then(to_rgba);
    textured.unwrap_or_else(|| {
        let [r, g, b, a] = pbr.base_color_factor().map(|c| (c.clamp(0.0, 1.0) * 255.0) as u8);
        RgbaImage::from_pixel(1, 1, image::Rgba([r, g, b, a]))
    })
}

fn to_rgba(data: &gltf::image::Data) -> Option<RgbaImage> {
    use gltf::image::Format;
    match data.format {
        Format::R8G8B8A8 => RgbaImage::from_raw(data.width, data.height, data.pixels.clone()),
        Format::R8G8B8 => image::RgbImage::from_raw(data.width, data.height, data.pixels.clone())
            .map(|rgb| image::DynamicImage::ImageRgb8(rgb).to_rgba8()),
        other => {
            log::warn!("unsupported base color format {other:?}, using flat color");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_sources_resolve_under_root() {
        let fetcher = MediaFetcher::new(PathBuf::from("/srv/media"));
        assert_eq!(
            fetcher.local_path("data/a.jpg"),
            Some(PathBuf::from("/srv/media/data/a.jpg"))
        );
        assert_eq!(fetcher.local_path("http://host/a.jpg"), None);
    }

    #[test]
    fn decodes_a_local_png() {
        let dir = tempfile::tempdir().unwrap();
        let img = RgbaImage::from_pixel(4, 2, image::Rgba([10, 20, 30, 255]));
        img.save(dir.path().join("pixel.png")).unwrap();

        let fetcher = MediaFetcher::new(dir.path().to_path_buf());
        let decoded = decode_image(&fetcher, "pixel.png").unwrap();
        assert_eq!(decoded.dimensions(), (4, 2));
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = MediaFetcher::new(dir.path().to_path_buf());
        assert!(decode_image(&fetcher, "nope.jpg").is_err());
    }
}
