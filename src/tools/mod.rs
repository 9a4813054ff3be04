pub mod adapter;
pub mod process;
pub mod nmap;
pub mod masscan;
pub mod nuclei;
pub mod subfinder;
pub mod ffuf;
pub mod dig;
pub mod script;

pub use adapter::{
    AdapterEvent, AdapterSummary, EventReceiver, EventSender, ParsedLine, ToolAdapter,
    ToolInvocation,
};
pub use nmap::{NmapAdapter, NmapProfile};
pub use masscan::MasscanAdapter;
pub use nuclei::NucleiAdapter;
pub use subfinder::SubfinderAdapter;
pub use ffuf::FfufAdapter;
pub use dig::DigAdapter;
pub use script::ScriptAdapter;
