/// Per-cell rasterizer for terminal rendering
use crossterm::{
    cursor::MoveTo,
    style::{Color, Print, ResetColor, SetForegroundColor},
    QueueableCommand,
};
use nalgebra::{Matrix3, Matrix4, Point3, Vector3};
use objview_core::{Camera, FlatMesh, Transform, Triangle};
use std::io::Write;

/// Character luminosity ramp for shading (darkest to lightest)
const LUMINOSITY_RAMP: &[char] = &[' ', '.', ':', '-', '=', '+', '*', '#', '%', '@'];

/// Phong lighting parameters
#[derive(Debug, Clone, PartialEq)]
pub struct Lighting {
    pub model_color: Vector3<f32>,
    pub light_color: Vector3<f32>,
    pub light_position: Point3<f32>,
    pub camera_position: Point3<f32>,
    pub ambient: f32,
    pub specular: f32,
    /// Specular exponent; lower values give broader highlights
    pub reflectance: f32,
}

impl Default for Lighting {
    fn default() -> Self {
        Self {
            model_color: Vector3::new(0.5, 0.5, 0.5),
            light_color: Vector3::new(0.8, 0.1, 0.2),
            light_position: Point3::new(5.0, 5.0, 10.0),
            camera_position: Point3::new(0.0, 0.0, 10.0),
            ambient: 0.1,
            specular: 0.5,
            reflectance: 80.0,
        }
    }
}

/// Lit result for one cell
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shade {
    /// Unweighted light amount in [0, 1], drives the character choice
    pub intensity: f32,
    /// Final RGB in [0, 1]
    pub color: Vector3<f32>,
}

impl Lighting {
    /// Shade a world-space surface point with a world-space normal
    pub fn shade(&self, normal: &Vector3<f32>, position: &Point3<f32>) -> Shade {
        let normal = normal.try_normalize(f32::EPSILON).unwrap_or_else(Vector3::z);
        let to_light = (self.light_position - position)
            .try_normalize(f32::EPSILON)
            .unwrap_or_else(Vector3::z);
        let to_eye = (self.camera_position - position)
            .try_normalize(f32::EPSILON)
            .unwrap_or_else(Vector3::z);

        let diffuse = normal.dot(&to_light).max(0.0);
        let reflected = 2.0 * normal.dot(&to_light) * normal - to_light;
        let specular = if diffuse > 0.0 {
            self.specular * to_eye.dot(&reflected).max(0.0).powf(self.reflectance)
        } else {
            0.0
        };

        let light = self.ambient + diffuse + specular;
        let color = (self.light_color * light)
            .component_mul(&self.model_color)
            .map(|c| c.clamp(0.0, 1.0));
        Shade {
            intensity: light.clamp(0.0, 1.0),
            color,
        }
    }
}

/// ASCII renderer that converts 3D meshes to terminal characters
pub struct AsciiRenderer {
    width: usize,
    height: usize,
    depth_buffer: Vec<f32>,
    char_buffer: Vec<char>,
    color_buffer: Vec<Color>,
}

impl AsciiRenderer {
    pub fn new(width: usize, height: usize) -> Self {
        let size = width * height;
        Self {
            width,
            height,
            depth_buffer: vec![f32::INFINITY; size],
            char_buffer: vec![' '; size],
            color_buffer: vec![Color::Reset; size],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn clear(&mut self) {
        self.depth_buffer.fill(f32::INFINITY);
        self.char_buffer.fill(' ');
        self.color_buffer.fill(Color::Reset);
    }

    /// Character at a cell, if the cell exists
    pub fn char_at(&self, x: usize, y: usize) -> Option<char> {
        if x < self.width && y < self.height {
            Some(self.char_buffer[y * self.width + x])
        } else {
            None
        }
    }

    pub fn render_mesh(
        &mut self,
        mesh: &FlatMesh,
        model_matrix: &Matrix4<f32>,
        camera: &Camera,
        lighting: &Lighting,
    ) {
        let normal_matrix = Transform::normal_matrix(model_matrix);
        for triangle in mesh.triangles() {
            self.render_triangle(&triangle, model_matrix, &normal_matrix, camera, lighting);
        }
    }

    fn render_triangle(
        &mut self,
        triangle: &Triangle,
        model_matrix: &Matrix4<f32>,
        normal_matrix: &Matrix3<f32>,
        camera: &Camera,
        lighting: &Lighting,
    ) {
        // Project vertices to normalized device coordinates
        let mut ndc = [Point3::origin(); 3];
        for (projected, vertex) in ndc.iter_mut().zip(&triangle.vertices) {
            match camera.project_to_ndc(&vertex.position, model_matrix) {
                Some(point) => *projected = point,
                None => return, // Triangle is clipped
            }
        }

        // Counter-clockwise triangles face the camera
        let signed_area = (ndc[1].x - ndc[0].x) * (ndc[2].y - ndc[0].y)
            - (ndc[2].x - ndc[0].x) * (ndc[1].y - ndc[0].y);
        if signed_area <= 0.0 {
            return;
        }

        let face_normal = normal_matrix * triangle.calculate_normal();
        let (width, height) = (self.width as f32, self.height as f32);
        let corners: [Corner; 3] = std::array::from_fn(|i| {
            let vertex = &triangle.vertices[i];
            let normal = normal_matrix * vertex.normal;
            Corner {
                x: (ndc[i].x + 1.0) * 0.5 * width,
                y: (1.0 - ndc[i].y) * 0.5 * height,
                depth: ndc[i].z,
                world: model_matrix.transform_point(&vertex.position),
                normal: if normal.norm_squared() > f32::EPSILON {
                    normal
                } else {
                    face_normal
                },
            }
        });

        self.rasterize_triangle(&corners, lighting);
    }

    fn rasterize_triangle(&mut self, corners: &[Corner; 3], lighting: &Lighting) {
        let [v0, v1, v2] = corners;

        // Bounding box
        let min_x = v0.x.min(v1.x).min(v2.x).floor() as i32;
        let max_x = v0.x.max(v1.x).max(v2.x).ceil() as i32;
        let min_y = v0.y.min(v1.y).min(v2.y).floor() as i32;
        let max_y = v0.y.max(v1.y).max(v2.y).ceil() as i32;

        // Clip to screen bounds
        let min_x = min_x.max(0);
        let max_x = max_x.min(self.width as i32 - 1);
        let min_y = min_y.max(0);
        let max_y = max_y.min(self.height as i32 - 1);

        // Scanline rasterization
        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let px = x as f32 + 0.5;
                let py = y as f32 + 0.5;

                // Barycentric coordinates
                let Some((w0, w1, w2)) =
                    barycentric((v0.x, v0.y), (v1.x, v1.y), (v2.x, v2.y), (px, py))
                else {
                    continue;
                };
                if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                    continue;
                }

                // Interpolate depth
                let depth = w0 * v0.depth + w1 * v1.depth + w2 * v2.depth;
                let idx = y as usize * self.width + x as usize;
                if depth >= self.depth_buffer[idx] {
                    continue;
                }

                let normal = v0.normal * w0 + v1.normal * w1 + v2.normal * w2;
                let world = Point3::from(
                    v0.world.coords * w0 + v1.world.coords * w1 + v2.world.coords * w2,
                );
                let shade = lighting.shade(&normal, &world);

                self.depth_buffer[idx] = depth;
                self.char_buffer[idx] = ramp_char(shade.intensity);
                self.color_buffer[idx] = rgb(&shade.color);
            }
        }
    }

    /// Write the frame, one `MoveTo` per row so raw mode needs no newlines
    pub fn draw<W: Write>(&self, writer: &mut W, color: bool) -> std::io::Result<()> {
        let mut current = None;
        for y in 0..self.height {
            writer.queue(MoveTo(0, y as u16))?;
            for x in 0..self.width {
                let idx = y * self.width + x;
                if color && current != Some(self.color_buffer[idx]) {
                    current = Some(self.color_buffer[idx]);
                    writer.queue(SetForegroundColor(self.color_buffer[idx]))?;
                }
                writer.queue(Print(self.char_buffer[idx]))?;
            }
        }
        if color {
            writer.queue(ResetColor)?;
        }
        Ok(())
    }
}

/// Screen-space corner of a triangle with the attributes lighting needs
#[derive(Debug, Clone, Copy)]
struct Corner {
    x: f32,
    y: f32,
    depth: f32,
    world: Point3<f32>,
    normal: Vector3<f32>,
}

fn ramp_char(intensity: f32) -> char {
    let index = (intensity * (LUMINOSITY_RAMP.len() - 1) as f32).round() as usize;
    LUMINOSITY_RAMP[index.min(LUMINOSITY_RAMP.len() - 1)]
}

fn rgb(color: &Vector3<f32>) -> Color {
    Color::Rgb {
        r: (color.x * 255.0) as u8,
        g: (color.y * 255.0) as u8,
        b: (color.z * 255.0) as u8,
    }
}

/// Calculate barycentric coordinates for a point in a triangle
fn barycentric(
    v0: (f32, f32),
    v1: (f32, f32),
    v2: (f32, f32),
    p: (f32, f32),
) -> Option<(f32, f32, f32)> {
    let denom = (v1.1 - v2.1) * (v0.0 - v2.0) + (v2.0 - v1.0) * (v0.1 - v2.1);

    if denom.abs() < 1e-6 {
        return None;
    }

    let w0 = ((v1.1 - v2.1) * (p.0 - v2.0) + (v2.0 - v1.0) * (p.1 - v2.1)) / denom;
    let w1 = ((v2.1 - v0.1) * (p.0 - v2.0) + (v0.0 - v2.0) * (p.1 - v2.1)) / denom;
    let w2 = 1.0 - w0 - w1;

    Some((w0, w1, w2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use objview_core::{MeshBuilder, ObjParser};
    use std::io::Cursor;

    const WIDTH: usize = 40;
    const HEIGHT: usize = 20;

    fn mesh(text: &str) -> FlatMesh {
        let data = ObjParser::parse(Cursor::new(text.as_bytes())).unwrap();
        MeshBuilder::build(&data).unwrap()
    }

    fn render(text: &str) -> AsciiRenderer {
        let mesh = mesh(text);
        let camera = Camera::new(WIDTH as f32 * 8.0, HEIGHT as f32 * 16.0);
        let model = Transform::uniform_scale(mesh.scale());
        let mut renderer = AsciiRenderer::new(WIDTH, HEIGHT);
        renderer.render_mesh(&mesh, &model, &camera, &Lighting::default());
        renderer
    }

    fn covered(renderer: &AsciiRenderer) -> usize {
        renderer.char_buffer.iter().filter(|c| **c != ' ').count()
    }

    const FRONT: &str = "v -1 -1 0\nv 1 -1 0\nv 0 1 0\nvn 0 0 1\nf 1//1 2//1 3//1\n";
    const BACK: &str = "v -1 -1 0\nv 1 -1 0\nv 0 1 0\nvn 0 0 1\nf 1//1 3//1 2//1\n";

    #[test]
    fn test_front_face_is_drawn() {
        let renderer = render(FRONT);
        assert_ne!(renderer.char_at(WIDTH / 2, HEIGHT / 2), Some(' '));
        assert!(covered(&renderer) > 10);
        // Corners of the screen stay empty
        assert_eq!(renderer.char_at(0, 0), Some(' '));
        assert_eq!(renderer.char_at(WIDTH - 1, 0), Some(' '));
    }

    #[test]
    fn test_back_face_is_culled() {
        let renderer = render(BACK);
        assert_eq!(covered(&renderer), 0);
    }

    #[test]
    fn test_depth_test_is_order_independent() {
        let near = "v -1 -1 0\nv 1 -1 0\nv 0 1 0\nvn 0 0 1\n";
        let far = "v -3 -3 -1\nv 3 -3 -1\nv 0 3 -1\nvn 0 1 0\n";
        let a = render(&format!("{near}{far}f 1//1 2//1 3//1\nf 4//2 5//2 6//2\n"));
        let b = render(&format!("{near}{far}f 4//2 5//2 6//2\nf 1//1 2//1 3//1\n"));
        assert_eq!(a.char_buffer, b.char_buffer);
        assert_eq!(a.depth_buffer, b.depth_buffer);
    }

    #[test]
    fn test_clear_resets_buffers() {
        let mut renderer = render(FRONT);
        renderer.clear();
        assert_eq!(covered(&renderer), 0);
        assert!(renderer.depth_buffer.iter().all(|d| d.is_infinite()));
    }

    #[test]
    fn test_draw_without_color() {
        let renderer = render(FRONT);
        let mut out = Vec::new();
        renderer.draw(&mut out, false).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(!text.contains("\x1b[38;"));
        assert!(text.chars().any(|c| LUMINOSITY_RAMP[1..].contains(&c)));
    }

    #[test]
    fn test_draw_with_color() {
        let renderer = render(FRONT);
        let mut out = Vec::new();
        renderer.draw(&mut out, true).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("\x1b[38;2;"));
    }

    #[test]
    fn test_lit_side_is_brighter() {
        let lighting = Lighting::default();
        let position = Point3::origin();
        let toward = lighting.shade(&Vector3::new(0.0, 0.0, 1.0), &position);
        let away = lighting.shade(&Vector3::new(0.0, 0.0, -1.0), &position);
        assert!(toward.intensity > away.intensity);
        assert!((away.intensity - lighting.ambient).abs() < 1e-6);
    }

    #[test]
    fn test_ramp_bounds() {
        assert_eq!(ramp_char(0.0), ' ');
        assert_eq!(ramp_char(1.0), '@');
        assert_eq!(ramp_char(5.0), '@');
    }

    #[test]
    fn test_barycentric_degenerate() {
        assert!(barycentric((0.0, 0.0), (1.0, 1.0), (2.0, 2.0), (0.5, 0.5)).is_none());
    }
}
