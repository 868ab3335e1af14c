//! Reference NES front-end.
//!
//! Self-test flags exit with 0 (pass) or 1 (fail) for scripted
//! checks; `--load-rom=` opens a winit window with a pixels surface
//! and cpal audio, or runs headless with `--headless`/`--screenshot`.

use std::path::PathBuf;
use std::process;
use std::time::{Duration, Instant};

use nes_core::{selftest, Button, Console, FB_HEIGHT, FB_WIDTH};
use pixels::{Pixels, SurfaceTexture};
use winit::application::ApplicationHandler;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowAttributes, WindowId};

mod audio;
mod capture;

use audio::AudioOutput;

/// Window scale factor.
const SCALE: u32 = 3;

/// ~60 Hz NTSC frame pacing for the windowed loop.
const FRAME_DURATION: Duration = Duration::from_micros(16_639);

struct CliArgs {
    rom_path: Option<PathBuf>,
    cpu_cycles_per_frame: Option<u32>,
    headless: bool,
    frames: u32,
    screenshot_path: Option<PathBuf>,
}

fn parse_args() -> CliArgs {
    let mut cli = CliArgs {
        rom_path: None,
        cpu_cycles_per_frame: None,
        headless: false,
        frames: 200,
        screenshot_path: None,
    };

    let args: Vec<String> = std::env::args().collect();
    let mut i = 1;
    while i < args.len() {
        let arg = args[i].as_str();
        match arg {
            // Self-test flags run immediately and exit.
            "--cpu-self-test" => exit_self_test("CPU self-test", selftest::cpu_tiny()),
            "--ppu-self-test" => exit_self_test(
                "PPU self-test",
                selftest::ppu_vram_increment() && selftest::ppu_mirroring(),
            ),
            "--ppu-mirror-test" => {
                exit_self_test("PPU mirroring test", selftest::ppu_mirroring())
            }
            "--mapper-self-test" => {
                exit_self_test("Mapper self-test (MMC1 basic)", selftest::mapper_mmc1_basic())
            }
            "--headless" => cli.headless = true,
            "--frames" => {
                i += 1;
                if let Some(n) = args.get(i) {
                    cli.frames = n.parse().unwrap_or(200);
                }
            }
            "--screenshot" => {
                i += 1;
                cli.screenshot_path = args.get(i).map(PathBuf::from);
            }
            "--help" | "-h" => {
                print_usage();
                process::exit(0);
            }
            _ => {
                if let Some(path) = arg.strip_prefix("--load-rom=") {
                    cli.rom_path = Some(PathBuf::from(path));
                } else if let Some(n) = arg.strip_prefix("--cpu-cycles-per-frame=") {
                    match n.parse() {
                        Ok(cycles) => cli.cpu_cycles_per_frame = Some(cycles),
                        Err(_) => {
                            eprintln!("invalid cycle count: {n}");
                            process::exit(1);
                        }
                    }
                } else {
                    eprintln!("unknown argument: {arg}");
                    print_usage();
                    process::exit(1);
                }
            }
        }
        i += 1;
    }

    cli
}

fn print_usage() {
    eprintln!("Usage: nes-runner [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --load-rom=PATH             iNES ROM file (.nes)");
    eprintln!("  --cpu-cycles-per-frame=N    CPU cycle budget per frame [29780]");
    eprintln!("  --headless                  Run without a window");
    eprintln!("  --frames N                  Frames to run headless [200]");
    eprintln!("  --screenshot PATH           Save a PNG after headless run");
    eprintln!("  --cpu-self-test             Run the CPU smoke test and exit");
    eprintln!("  --ppu-self-test             Run the PPU smoke tests and exit");
    eprintln!("  --ppu-mirror-test           Run the mirroring test and exit");
    eprintln!("  --mapper-self-test          Run the MMC1 smoke test and exit");
}

fn exit_self_test(name: &str, ok: bool) -> ! {
    println!("{name}: {}", if ok { "PASS" } else { "FAIL" });
    process::exit(i32::from(!ok));
}

fn make_console(cli: &CliArgs) -> Console {
    let rom_path = cli.rom_path.as_ref().unwrap_or_else(|| {
        eprintln!("no ROM specified; use --load-rom=PATH");
        process::exit(1);
    });

    let rom = match std::fs::read(rom_path) {
        Ok(data) => data,
        Err(err) => {
            eprintln!("failed to read {}: {err}", rom_path.display());
            process::exit(1);
        }
    };

    let mut console = Console::new();
    if let Err(err) = console.insert_cartridge(&rom) {
        eprintln!("failed to load {}: {err}", rom_path.display());
        process::exit(1);
    }
    if let Some(cycles) = cli.cpu_cycles_per_frame {
        console.set_cpu_cycles_per_frame(cycles);
    }
    eprintln!("loaded {}", rom_path.display());
    console
}

fn run_headless(cli: &CliArgs) {
    let mut console = make_console(cli);
    for _ in 0..cli.frames {
        console.next_frame();
    }
    if let Some(ref path) = cli.screenshot_path {
        if let Err(err) = capture::save_screenshot(&console, path) {
            eprintln!("screenshot error: {err}");
            process::exit(1);
        }
        eprintln!("screenshot saved to {}", path.display());
    }
}

fn map_keycode(keycode: KeyCode) -> Option<Button> {
    match keycode {
        KeyCode::KeyZ => Some(Button::A),
        KeyCode::KeyX => Some(Button::B),
        KeyCode::ShiftLeft | KeyCode::ShiftRight => Some(Button::Select),
        KeyCode::Enter => Some(Button::Start),
        KeyCode::ArrowUp => Some(Button::Up),
        KeyCode::ArrowDown => Some(Button::Down),
        KeyCode::ArrowLeft => Some(Button::Left),
        KeyCode::ArrowRight => Some(Button::Right),
        _ => None,
    }
}

struct App {
    console: Console,
    audio: Option<AudioOutput>,
    sample_buf: Vec<f32>,
    window: Option<&'static Window>,
    pixels: Option<Pixels<'static>>,
    last_frame_time: Instant,
}

impl App {
    fn new(console: Console) -> Self {
        let audio = AudioOutput::new();
        if audio.is_none() {
            eprintln!("no audio device; running video-only");
        }
        Self {
            console,
            audio,
            sample_buf: vec![0.0; 2048],
            window: None,
            pixels: None,
            last_frame_time: Instant::now(),
        }
    }

    fn handle_key(&mut self, keycode: KeyCode, pressed: bool) {
        if let Some(button) = map_keycode(keycode) {
            if pressed {
                self.console.press_button(button);
            } else {
                self.console.release_button(button);
            }
        }
    }

    fn run_frame(&mut self) {
        self.console.next_frame();
        let drained = self.console.drain_apu_samples(&mut self.sample_buf);
        if let Some(ref mut audio) = self.audio {
            // Blocking push: the audio device paces the emulation.
            audio.push_samples(&self.sample_buf[..drained]);
        }
    }

    fn update_pixels(&mut self) {
        let Some(pixels) = self.pixels.as_mut() else {
            return;
        };
        let frame = pixels.frame_mut();
        for (pixel, &argb) in frame.chunks_exact_mut(4).zip(self.console.frame_buffer()) {
            pixel[0] = (argb >> 16) as u8;
            pixel[1] = (argb >> 8) as u8;
            pixel[2] = argb as u8;
            pixel[3] = 0xFF;
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let size =
            winit::dpi::LogicalSize::new(FB_WIDTH as u32 * SCALE, FB_HEIGHT as u32 * SCALE);
        let attrs = WindowAttributes::default()
            .with_title("NES")
            .with_inner_size(size)
            .with_resizable(false);

        match event_loop.create_window(attrs) {
            Ok(window) => {
                let window: &'static Window = Box::leak(Box::new(window));
                let inner = window.inner_size();
                let surface = SurfaceTexture::new(inner.width, inner.height, window);
                match Pixels::new(FB_WIDTH as u32, FB_HEIGHT as u32, surface) {
                    Ok(pixels) => self.pixels = Some(pixels),
                    Err(err) => {
                        eprintln!("failed to create surface: {err}");
                        event_loop.exit();
                        return;
                    }
                }
                self.window = Some(window);
            }
            Err(err) => {
                eprintln!("failed to create window: {err}");
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(keycode) = event.physical_key {
                    if keycode == KeyCode::Escape && event.state == ElementState::Pressed {
                        event_loop.exit();
                        return;
                    }
                    self.handle_key(keycode, event.state == ElementState::Pressed);
                }
            }
            WindowEvent::RedrawRequested => {
                let now = Instant::now();
                if now.duration_since(self.last_frame_time) >= FRAME_DURATION {
                    self.run_frame();
                    self.update_pixels();
                    self.last_frame_time = now;
                }
                if let Some(pixels) = self.pixels.as_ref() {
                    if let Err(err) = pixels.render() {
                        eprintln!("render error: {err}");
                        event_loop.exit();
                    }
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = self.window {
            window.request_redraw();
        }
    }
}

fn main() {
    let cli = parse_args();

    if cli.headless {
        run_headless(&cli);
        return;
    }

    let console = make_console(&cli);
    let mut app = App::new(console);

    let event_loop = match EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(err) => {
            eprintln!("failed to create event loop: {err}");
            process::exit(1);
        }
    };

    if let Err(err) = event_loop.run_app(&mut app) {
        eprintln!("event loop error: {err}");
        process::exit(1);
    }
}
