//! IXR-cmd / IXR-rsp (§4.1.7): the seam between the Transaction Table and
//! the XRAM port. Issues GETs and PUTs, and demultiplexes the response
//! back through [`crate::tables::trt::TransactionTable::write_rsp`] two
//! words at a time, exactly as a real 64-bit-flit XRAM response would
//! arrive.

use crate::common::addr::Addr;
use crate::common::error::McError;
use crate::controller::ports::XramPort;
use crate::controller::Controller;

impl<X: XramPort, C: crate::controller::ports::CoherencePort> Controller<X, C> {
    /// Issues a GET for the line at `addr` into TRT slot `trt_index`,
    /// applies the write-through merge against the fetched data, and
    /// returns the merged line. Leaves `trt_index`'s `rerror` flag set if
    /// XRAM reported a failure.
    pub(crate) fn xram_get(&mut self, trt_index: usize, addr: Addr, plen: u32) -> Result<Vec<u32>, McError> {
        match self.xram.get(addr, plen) {
            Ok(data) => {
                for (pair_idx, pair) in data.chunks(2).enumerate() {
                    let lo = pair[0];
                    let hi = pair.get(1).copied().unwrap_or(0);
                    self.trt.write_rsp(trt_index, pair_idx, (lo, hi), false);
                }
                Ok(self.trt.get(trt_index).wdata.clone())
            }
            Err(err) => {
                self.trt.get_mut(trt_index).rerror = true;
                Err(err)
            }
        }
    }

    /// Issues a PUT writing back `data` at `addr`.
    pub(crate) fn xram_put(&mut self, addr: Addr, data: &[u32]) {
        self.xram.put(addr, data);
    }
}
