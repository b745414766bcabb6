//! USB device session.
//!
//! The keyboard is driven through raw HID class control transfers on
//! interface 0, so any kernel driver bound to it is detached first.

use std::time::Duration;

use bytes::{Bytes, BytesMut};
use rusb::{Context, DeviceHandle, Direction, Recipient, RequestType, UsbContext};
use tracing::{debug, trace, warn};

use crate::controller::FeatureReportDevice;
use crate::devices::DeviceId;
use crate::error::{Error, Result, TransferError};
use crate::report::{MIN_REPORT_LEN, REPORT_ID};

/// Interface carrying the lighting feature reports.
const INTERFACE: u8 = 0;

/// Timeout of a single control transfer.
const TIMEOUT: Duration = Duration::from_millis(1000);

/// HID class requests.
const HID_GET_REPORT: u8 = 0x01;
const HID_SET_REPORT: u8 = 0x09;

/// HID feature report type.
const HID_FEATURE: u16 = 0x03;

/// Control transfer `wValue` selecting the lighting feature report.
const REPORT_VALUE: u16 = (HID_FEATURE << 8) | REPORT_ID as u16;

/// Claimed HID interface of an opened keyboard.
pub trait HidInterface {
    /// Issue a Set Report request, returning the number of bytes written.
    fn set_feature_report(&mut self, report: &[u8]) -> rusb::Result<usize>;

    /// Issue a Get Report request, returning the number of bytes read.
    fn get_feature_report(&mut self, buf: &mut [u8]) -> rusb::Result<usize>;

    /// Give up the claimed interface.
    fn release(&mut self) -> rusb::Result<()>;
}

impl HidInterface for DeviceHandle<Context> {
    fn set_feature_report(&mut self, report: &[u8]) -> rusb::Result<usize> {
        let request_type =
            rusb::request_type(Direction::Out, RequestType::Class, Recipient::Interface);
        self.write_control(
            request_type,
            HID_SET_REPORT,
            REPORT_VALUE,
            INTERFACE as u16,
            report,
            TIMEOUT,
        )
    }

    fn get_feature_report(&mut self, buf: &mut [u8]) -> rusb::Result<usize> {
        let request_type =
            rusb::request_type(Direction::In, RequestType::Class, Recipient::Interface);
        self.read_control(
            request_type,
            HID_GET_REPORT,
            REPORT_VALUE,
            INTERFACE as u16,
            buf,
            TIMEOUT,
        )
    }

    fn release(&mut self) -> rusb::Result<()> {
        self.release_interface(INTERFACE)
    }
}

/// Opened keyboard.
///
/// Dropping a libusb handle closes the device and tears down its USB context.
struct OpenDevice<D> {
    id: DeviceId,
    interface: D,
}

/// Exclusive USB session with a single keyboard.
pub struct UsbSession<D: HidInterface = DeviceHandle<Context>> {
    device: Option<OpenDevice<D>>,
}

impl<D: HidInterface> Default for UsbSession<D> {
    fn default() -> Self {
        Self { device: None }
    }
}

impl UsbSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open and claim a specific keyboard.
    ///
    /// Does nothing if a device is already open. On failure the session is
    /// left closed.
    pub fn open(&mut self, id: DeviceId) -> Result<()> {
        if self.is_open() {
            return Ok(());
        }

        let context = Context::new().map_err(Error::UsbUnavailable)?;
        self.open_with(id, |id| open_device(&context, id))
    }

    /// Open the first keyboard of `candidates` which can be claimed.
    ///
    /// Returns the identity of the opened device. If a device is already open,
    /// its identity is returned instead. Failing to initialize libusb is
    /// reported as [`Error::UsbUnavailable`], since no candidate could have
    /// been tried.
    pub fn auto_detect(&mut self, candidates: &[DeviceId]) -> Result<DeviceId> {
        if let Some(id) = self.identity() {
            return Ok(id);
        }

        if candidates.is_empty() {
            return Err(Error::NoSupportedDeviceFound);
        }

        let context = Context::new().map_err(Error::UsbUnavailable)?;
        self.auto_detect_with(candidates, |id| open_device(&context, id))
    }
}

impl<D: HidInterface> UsbSession<D> {
    pub fn is_open(&self) -> bool {
        self.device.is_some()
    }

    /// Identity of the currently open device.
    pub fn identity(&self) -> Option<DeviceId> {
        self.device.as_ref().map(|device| device.id)
    }

    /// Open a device through `open`, unless one is open already.
    fn open_with<F>(&mut self, id: DeviceId, open: F) -> Result<()>
    where
        F: FnOnce(DeviceId) -> Result<D>,
    {
        if self.is_open() {
            return Ok(());
        }

        let interface = open(id)?;
        self.device = Some(OpenDevice { id, interface });

        Ok(())
    }

    /// Try `open` on every candidate in order, keeping the first success.
    fn auto_detect_with<F>(&mut self, candidates: &[DeviceId], mut open: F) -> Result<DeviceId>
    where
        F: FnMut(DeviceId) -> Result<D>,
    {
        if let Some(id) = self.identity() {
            return Ok(id);
        }

        for &id in candidates {
            match open(id) {
                Ok(interface) => {
                    self.device = Some(OpenDevice { id, interface });
                    return Ok(id);
                },
                Err(err) => debug!("Skipping device {id}: {err}"),
            }
        }

        Err(Error::NoSupportedDeviceFound)
    }

    /// Release the keyboard.
    ///
    /// Does nothing if no device is open.
    pub fn close(&mut self) {
        let Some(mut device) = self.device.take() else { return };

        if let Err(err) = device.interface.release() {
            warn!("Unable to release interface of {}: {err}", device.id);
        }

        debug!("Closed device {}", device.id);
    }

    fn interface(&mut self) -> Result<&mut D> {
        self.device.as_mut().map(|device| &mut device.interface).ok_or(Error::NotOpen)
    }
}

impl<D: HidInterface> FeatureReportDevice for UsbSession<D> {
    fn send_report(&mut self, report: &[u8]) -> Result<()> {
        let written = self
            .interface()?
            .set_feature_report(report)
            .map_err(|err| Error::TransferFailed(err.into()))?;

        trace!("Sent {written} byte feature report: {report:02x?}");

        if written != report.len() {
            let cause = TransferError::Length { expected: report.len(), actual: written };
            return Err(Error::TransferFailed(cause));
        }

        Ok(())
    }

    fn get_report(&mut self, buffer_size: usize) -> Result<Bytes> {
        let mut buf = BytesMut::zeroed(buffer_size);
        let read = self
            .interface()?
            .get_feature_report(&mut buf)
            .map_err(|err| Error::TransferFailed(err.into()))?;
        buf.truncate(read);

        trace!("Received {read} byte feature report: {:02x?}", &buf[..]);

        if read < MIN_REPORT_LEN {
            let cause = TransferError::Length { expected: MIN_REPORT_LEN, actual: read };
            return Err(Error::TransferFailed(cause));
        }

        Ok(buf.freeze())
    }
}

impl<D: HidInterface> Drop for UsbSession<D> {
    fn drop(&mut self) {
        self.close();
    }
}

/// Open a keyboard and take over its lighting interface.
///
/// The handle is dropped again if the interface cannot be claimed.
fn open_device(context: &Context, id: DeviceId) -> Result<DeviceHandle<Context>> {
    let mut handle = context.open_device_with_vid_pid(id.vendor_id, id.product_id).ok_or(
        Error::DeviceNotFound { vendor_id: id.vendor_id, product_id: id.product_id },
    )?;

    // Not every platform can report or detach kernel drivers; claiming will
    // tell whether the interface is usable.
    if let Ok(true) = handle.kernel_driver_active(INTERFACE) {
        debug!("Detaching kernel driver from interface {INTERFACE} of {id}");
        if let Err(err) = handle.detach_kernel_driver(INTERFACE) {
            debug!("Unable to detach kernel driver of {id}: {err}");
        }
    }

    handle.claim_interface(INTERFACE).map_err(Error::InterfaceClaimFailed)?;
    debug!("Claimed interface {INTERFACE} of {id}");

    Ok(handle)
}
