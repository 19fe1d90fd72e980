//! GDI block-copy capture with scoped handle cleanup.

use std::ffi::c_void;

use windows::Win32::Foundation::HWND;
use windows::Win32::Graphics::Gdi::{
    BI_RGB, BITMAPINFO, BITMAPINFOHEADER, BitBlt, CreateCompatibleBitmap, CreateCompatibleDC,
    DIB_RGB_COLORS, DeleteDC, DeleteObject, GetDC, GetDIBits, GetWindowDC, HBITMAP, HDC, HGDIOBJ,
    ReleaseDC, SRCCOPY, SelectObject,
};

use crate::capture::{Bitmap, CaptureError};

/// A device context obtained with `GetDC`/`GetWindowDC`, released on drop.
struct DeviceContext {
    hwnd: HWND,
    hdc: HDC,
}

impl DeviceContext {
    fn screen() -> Result<Self, CaptureError> {
        let hwnd = HWND(std::ptr::null_mut());
        let hdc = unsafe { GetDC(hwnd) };
        Self::checked(hwnd, hdc, "screen")
    }

    fn window(hwnd: HWND) -> Result<Self, CaptureError> {
        let hdc = unsafe { GetWindowDC(hwnd) };
        Self::checked(hwnd, hdc, "window")
    }

    fn checked(hwnd: HWND, hdc: HDC, what: &str) -> Result<Self, CaptureError> {
        if hdc.is_invalid() {
            return Err(CaptureError::CaptureFailed(format!(
                "failed to get {} device context",
                what
            )));
        }
        Ok(Self { hwnd, hdc })
    }
}

impl Drop for DeviceContext {
    fn drop(&mut self) {
        unsafe {
            ReleaseDC(self.hwnd, self.hdc);
        }
    }
}

struct MemoryDc(HDC);

impl Drop for MemoryDc {
    fn drop(&mut self) {
        unsafe {
            let _ = DeleteDC(self.0);
        }
    }
}

struct CompatibleBitmap(HBITMAP);

impl Drop for CompatibleBitmap {
    fn drop(&mut self) {
        unsafe {
            let _ = DeleteObject(HGDIOBJ(self.0.0));
        }
    }
}

/// Copies `width`x`height` pixels at (`x`, `y`) of the screen.
pub fn capture_screen_region(
    x: i32,
    y: i32,
    width: u32,
    height: u32,
) -> Result<Bitmap, CaptureError> {
    let source = DeviceContext::screen()?;
    blit(&source, x, y, width, height)
}

/// Copies the whole window, including its non-client area, from its own
/// device context.
pub fn capture_window_dc(hwnd: HWND, width: u32, height: u32) -> Result<Bitmap, CaptureError> {
    let source = DeviceContext::window(hwnd)?;
    blit(&source, 0, 0, width, height)
}

fn blit(
    source: &DeviceContext,
    x: i32,
    y: i32,
    width: u32,
    height: u32,
) -> Result<Bitmap, CaptureError> {
    if width == 0 || height == 0 {
        return Err(CaptureError::CaptureFailed(
            "invalid region dimensions".to_string(),
        ));
    }
    let (w, h) = (width as i32, height as i32);

    unsafe {
        let mem_dc = CreateCompatibleDC(source.hdc);
        if mem_dc.is_invalid() {
            return Err(CaptureError::CaptureFailed(
                "failed to create memory DC".to_string(),
            ));
        }
        let mem_dc = MemoryDc(mem_dc);

        let bitmap = CreateCompatibleBitmap(source.hdc, w, h);
        if bitmap.is_invalid() {
            return Err(CaptureError::CaptureFailed(
                "failed to create compatible bitmap".to_string(),
            ));
        }
        let bitmap = CompatibleBitmap(bitmap);

        let previous = SelectObject(mem_dc.0, HGDIOBJ(bitmap.0.0));
        let copied = BitBlt(mem_dc.0, 0, 0, w, h, source.hdc, x, y, SRCCOPY);
        SelectObject(mem_dc.0, previous);
        copied.map_err(|e| CaptureError::CaptureFailed(format!("BitBlt failed: {}", e)))?;

        let mut bmi = BITMAPINFO {
            bmiHeader: BITMAPINFOHEADER {
                biSize: std::mem::size_of::<BITMAPINFOHEADER>() as u32,
                biWidth: w,
                // Negative height: top-down rows
                biHeight: -h,
                biPlanes: 1,
                biBitCount: 32,
                biCompression: BI_RGB.0,
                ..Default::default()
            },
            ..Default::default()
        };

        let mut pixels = vec![0u8; width as usize * height as usize * 4];
        let lines = GetDIBits(
            source.hdc,
            bitmap.0,
            0,
            height,
            Some(pixels.as_mut_ptr() as *mut c_void),
            &mut bmi,
            DIB_RGB_COLORS,
        );
        if lines != h {
            return Err(CaptureError::CaptureFailed(format!(
                "GetDIBits copied {} of {} rows",
                lines, height
            )));
        }

        Bitmap::from_bgrx(width, height, pixels)
    }
}
