use crate::protocol::RegisterGroup;
#[cfg(feature = "serde")]
use serde::Serialize;

use RegisterType::*;

/// Primitive encoding of a register. All multi byte values are little-endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum RegisterType {
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    F32,
    /// 16 byte character field, NUL padded
    Text16,
    /// 8 byte character field, NUL padded
    Text8,
}

impl RegisterType {
    /// Number of payload bytes occupied by a value of this type.
    pub const fn width(self) -> usize {
        match self {
            U8 | I8 => 1,
            U16 | I16 => 2,
            U32 | I32 | F32 => 4,
            Text16 => 16,
            Text8 => 8,
        }
    }
}

/// A named register at a fixed byte address of the BMS data space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct RegisterDescriptor {
    pub address: u16,
    pub register_type: RegisterType,
    pub name: &'static str,
}

const fn reg(address: u16, register_type: RegisterType, name: &'static str) -> RegisterDescriptor {
    RegisterDescriptor {
        address,
        register_type,
        name,
    }
}

/// All known registers, grouped by the window they are read with.
///
/// Addresses are byte offsets, not Modbus word addresses.
#[rustfmt::skip]
pub static REGISTERS: &[RegisterDescriptor] = &[
    // 0x1000 settings
    reg(0x1000, U32, "VolSmartSleep"),
    reg(0x1004, U32, "VolCellUV"),
    reg(0x1008, U32, "VolCellUVPR"),
    reg(0x100C, U32, "VolCellOV"),
    reg(0x1010, U32, "VolCellOVPR"),
    reg(0x1014, U32, "VolBalanTrig"),
    reg(0x1018, U32, "VolSoc100"),
    reg(0x101C, U32, "VolSoc0"),
    reg(0x1020, U32, "VolCellRCV"),
    reg(0x1024, U32, "VolCellRFV"),
    reg(0x1028, U32, "VolSysPwrOff"),
    reg(0x102C, U32, "CurBatCOC"),
    reg(0x1030, U32, "TIMBatCOCPDly"),
    reg(0x1034, U32, "TIMBatCOCPRDly"),
    reg(0x1038, U32, "CurBatDcOC"),
    reg(0x103C, U32, "TIMBatDcOCPDly"),
    reg(0x1040, U32, "TIMBatDcOCPRDly"),
    reg(0x1044, U32, "TIMBatSCPRDly"),
    reg(0x1048, U32, "CurBalanMax"),
    reg(0x104C, U32, "TMPBatCOT"),
    reg(0x1050, I32, "TMPBatCOTPR"),
    reg(0x1054, I32, "TMPBatDcOT"),
    reg(0x1058, I32, "TMPBatDcOTPR"),
    reg(0x105C, I32, "TMPBatCUT"),
    reg(0x1060, I32, "TMPBatCUTPR"),
    reg(0x1064, I32, "TMPMosOT"),
    reg(0x1068, I32, "TMPMosOTPR"),
    reg(0x106C, U32, "CellCount"),
    reg(0x1070, U32, "BatChargeEN"),
    reg(0x1074, U32, "BatDisChargeEN"),
    reg(0x1078, U32, "BalanEN"),
    reg(0x107C, U32, "CapBatCell"),
    reg(0x1080, U32, "SCPDelay"),
    reg(0x1084, U32, "VolStartBalan"),
    reg(0x1088, U32, "CellConWireRes0"),
    reg(0x108C, U32, "CellConWireRes1"),
    reg(0x1090, U32, "CellConWireRes2"),
    reg(0x1094, U32, "CellConWireRes3"),
    reg(0x1098, U32, "CellConWireRes4"),
    reg(0x109C, U32, "CellConWireRes5"),
    reg(0x10A0, U32, "CellConWireRes6"),
    reg(0x10A4, U32, "CellConWireRes7"),
    reg(0x10A8, U32, "CellConWireRes8"),
    reg(0x10AC, U32, "CellConWireRes9"),
    reg(0x10B0, U32, "CellConWireRes10"),
    reg(0x10B4, U32, "CellConWireRes11"),
    reg(0x10B8, U32, "CellConWireRes12"),
    reg(0x10BC, U32, "CellConWireRes13"),
    reg(0x10C0, U32, "CellConWireRes14"),
    reg(0x10C4, U32, "CellConWireRes15"),
    reg(0x10C8, U32, "CellConWireRes16"),
    reg(0x10CC, U32, "CellConWireRes17"),
    reg(0x10D0, U32, "CellConWireRes18"),
    reg(0x10D4, U32, "CellConWireRes19"),
    reg(0x10D8, U32, "CellConWireRes20"),
    reg(0x10DC, U32, "CellConWireRes21"),
    reg(0x10E0, U32, "CellConWireRes22"),
    reg(0x10E4, U32, "CellConWireRes23"),
    reg(0x10E8, U32, "CellConWireRes24"),
    reg(0x10EC, U32, "CellConWireRes25"),
    reg(0x10F0, U32, "CellConWireRes26"),
    reg(0x10F4, U32, "CellConWireRes27"),
    reg(0x10F8, U32, "CellConWireRes28"),
    reg(0x10FC, U32, "CellConWireRes29"),
    reg(0x1100, U32, "CellConWireRes30"),
    reg(0x1104, U32, "CellConWireRes31"),
    reg(0x1108, U32, "DevAddr"),
    reg(0x110C, U32, "TIMProdischarge"),
    reg(0x1114, U16, "Controls"),
    reg(0x1118, U8, "TIMSmartSleep"),
    reg(0x1119, U8, "DataDomainEnableControl"),

    // 0x1200 cell and battery data
    reg(0x1200, U16, "CellVol0"),
    reg(0x1202, U16, "CellVol1"),
    reg(0x1204, U16, "CellVol2"),
    reg(0x1206, U16, "CellVol3"),
    reg(0x1208, U16, "CellVol4"),
    reg(0x120A, U16, "CellVol5"),
    reg(0x120C, U16, "CellVol6"),
    reg(0x120E, U16, "CellVol7"),
    reg(0x1210, U16, "CellVol8"),
    reg(0x1212, U16, "CellVol9"),
    reg(0x1214, U16, "CellVol10"),
    reg(0x1216, U16, "CellVol11"),
    reg(0x1218, U16, "CellVol12"),
    reg(0x121A, U16, "CellVol13"),
    reg(0x121C, U16, "CellVol14"),
    reg(0x121E, U16, "CellVol15"),
    reg(0x1220, U16, "CellVol16"),
    reg(0x1222, U16, "CellVol17"),
    reg(0x1224, U16, "CellVol18"),
    reg(0x1226, U16, "CellVol19"),
    reg(0x1228, U16, "CellVol20"),
    reg(0x122A, U16, "CellVol21"),
    reg(0x122C, U16, "CellVol22"),
    reg(0x122E, U16, "CellVol23"),
    reg(0x1230, U16, "CellVol24"),
    reg(0x1232, U16, "CellVol25"),
    reg(0x1234, U16, "CellVol26"),
    reg(0x1236, U16, "CellVol27"),
    reg(0x1238, U16, "CellVol28"),
    reg(0x123A, U16, "CellVol29"),
    reg(0x123C, U16, "CellVol30"),
    reg(0x123E, U16, "CellVol31"),
    reg(0x1240, U32, "CellSta"),
    reg(0x1244, U16, "CellVolAve"),
    reg(0x1246, U16, "CellVdifMax"),
    reg(0x1248, U8, "MaxVolCellNbr"),
    reg(0x1249, U8, "MinVolCellNbr"),
    reg(0x124A, U16, "CellWireRes0"),
    reg(0x124C, U16, "CellWireRes1"),
    reg(0x124E, U16, "CellWireRes2"),
    reg(0x1250, U16, "CellWireRes3"),
    reg(0x1252, U16, "CellWireRes4"),
    reg(0x1254, U16, "CellWireRes5"),
    reg(0x1256, U16, "CellWireRes6"),
    reg(0x1258, U16, "CellWireRes7"),
    reg(0x125A, U16, "CellWireRes8"),
    reg(0x125C, U16, "CellWireRes9"),
    reg(0x125E, U16, "CellWireRes10"),
    reg(0x1260, U16, "CellWireRes11"),
    reg(0x1262, U16, "CellWireRes12"),
    reg(0x1264, U16, "CellWireRes13"),
    reg(0x1266, U16, "CellWireRes14"),
    reg(0x1268, U16, "CellWireRes15"),
    reg(0x126A, U16, "CellWireRes16"),
    reg(0x126C, U16, "CellWireRes17"),
    reg(0x126E, U16, "CellWireRes18"),
    reg(0x1270, U16, "CellWireRes19"),
    reg(0x1272, U16, "CellWireRes20"),
    reg(0x1274, U16, "CellWireRes21"),
    reg(0x1276, U16, "CellWireRes22"),
    reg(0x1278, U16, "CellWireRes23"),
    reg(0x127A, U16, "CellWireRes24"),
    reg(0x127C, U16, "CellWireRes25"),
    reg(0x127E, U16, "CellWireRes26"),
    reg(0x1280, U16, "CellWireRes27"),
    reg(0x1282, U16, "CellWireRes28"),
    reg(0x1284, U16, "CellWireRes29"),
    reg(0x1286, U16, "CellWireRes30"),
    reg(0x1288, U16, "CellWireRes31"),
    reg(0x128A, I16, "TempMos"),
    reg(0x128C, U32, "CellWireResSta"),
    reg(0x1290, U32, "TotBatVol"),
    reg(0x1294, U32, "BatWatt"),
    reg(0x1298, I32, "BatCurrent"),
    reg(0x129C, I16, "TempBat1"),
    reg(0x129E, I16, "TempBat2"),
    reg(0x12A0, U32, "Alarm"),
    reg(0x12A4, U16, "BalanCurrent"),
    reg(0x12A6, U8, "BalanSta"),
    reg(0x12A7, U8, "SOCStateOfCharge"),
    reg(0x12A8, I32, "SOCCapRemain"),
    reg(0x12AC, U32, "SOCFullChargeCap"),
    reg(0x12B0, U32, "SOCCycleCount"),
    reg(0x12B4, U32, "SOCCycleCap"),
    reg(0x12B8, U8, "SOCSOH"),
    reg(0x12B9, U8, "Precharge"),
    reg(0x12BA, U16, "UserAlarm"),
    reg(0x12BC, U32, "Runtime"),
    reg(0x12C0, U8, "Charge"),
    reg(0x12C1, U8, "Discharge"),
    reg(0x12C2, U16, "UserAlarm2"),
    reg(0x12C4, U16, "TimeDcOCPR"),
    reg(0x12C6, U16, "TimeDcSCPR"),
    reg(0x12C8, U16, "TimeCOCPR"),
    reg(0x12CA, U16, "TimeCSCPR"),
    reg(0x12CC, U16, "TimeUVPR"),
    reg(0x12CE, U16, "TimeOVPR"),
    reg(0x12D0, U8, "TempSensorAbsent"),
    reg(0x12D1, U8, "TempSensorHeating"),
    reg(0x12D4, U16, "TimeEmergency"),
    reg(0x12D6, U16, "BatDisCurCorrect"),
    reg(0x12D8, U16, "VolChargCur"),
    reg(0x12DA, U16, "VolDischargCur"),
    reg(0x12DC, F32, "BatVolCorrect"),
    reg(0x12E4, U16, "BatVol"),
    reg(0x12E6, I16, "HeatCurrent"),
    reg(0x12EF, U8, "ChargerPlugged"),
    reg(0x12F0, U32, "SysRunTicks"),
    reg(0x12F8, I16, "TempBat3"),
    reg(0x12FA, I16, "TempBat4"),
    reg(0x12FC, I16, "TempBat5"),
    reg(0x1300, U32, "RTCTicks"),
    reg(0x1308, U32, "TimeEnterSleep"),
    reg(0x130C, U8, "PCLModuleSta"),

    // 0x1400 device information
    reg(0x1400, Text16, "ManufacturerDeviceID"),
    reg(0x1410, Text8, "HardwareVersion"),
    reg(0x1418, Text8, "SoftwareVersion"),
    reg(0x1420, U32, "ODDRunTime"),
    reg(0x1424, U32, "PWROnTimes"),
    reg(0x1470, Text16, "Password"),
    reg(0x14B2, U8, "UART1MPRTOLNbr"),
    reg(0x14B3, U8, "CANMPRTOLNbr"),
    reg(0x14B4, U8, "UART1MPRTOLEnable0"),
    reg(0x14B5, U8, "UART1MPRTOLEnable1"),
    reg(0x14B6, U8, "UART1MPRTOLEnable2"),
    reg(0x14B7, U8, "UART1MPRTOLEnable3"),
    reg(0x14B8, U8, "UART1MPRTOLEnable4"),
    reg(0x14B9, U8, "UART1MPRTOLEnable5"),
    reg(0x14BA, U8, "UART1MPRTOLEnable6"),
    reg(0x14BB, U8, "UART1MPRTOLEnable7"),
    reg(0x14BC, U8, "UART1MPRTOLEnable8"),
    reg(0x14BD, U8, "UART1MPRTOLEnable9"),
    reg(0x14BE, U8, "UART1MPRTOLEnable10"),
    reg(0x14BF, U8, "UART1MPRTOLEnable11"),
    reg(0x14C0, U8, "UART1MPRTOLEnable12"),
    reg(0x14C1, U8, "UART1MPRTOLEnable13"),
    reg(0x14C2, U8, "UART1MPRTOLEnable14"),
    reg(0x14C3, U8, "UART1MPRTOLEnable15"),
    reg(0x14C4, U8, "CANMPRTOLEnable0"),
    reg(0x14C5, U8, "CANMPRTOLEnable1"),
    reg(0x14C6, U8, "CANMPRTOLEnable2"),
    reg(0x14C7, U8, "CANMPRTOLEnable3"),
    reg(0x14C8, U8, "CANMPRTOLEnable4"),
    reg(0x14C9, U8, "CANMPRTOLEnable5"),
    reg(0x14CA, U8, "CANMPRTOLEnable6"),
    reg(0x14CB, U8, "CANMPRTOLEnable7"),
    reg(0x14CC, U8, "CANMPRTOLEnable8"),
    reg(0x14CD, U8, "CANMPRTOLEnable9"),
    reg(0x14CE, U8, "CANMPRTOLEnable10"),
    reg(0x14CF, U8, "CANMPRTOLEnable11"),
    reg(0x14D0, U8, "CANMPRTOLEnable12"),
    reg(0x14D1, U8, "CANMPRTOLEnable13"),
    reg(0x14D2, U8, "CANMPRTOLEnable14"),
    reg(0x14D3, U8, "CANMPRTOLEnable15"),
    reg(0x14D4, U8, "UART2MPRTOLNbr"),
    reg(0x14D5, U8, "UART2MPRTOLEnable"),
    reg(0x14E4, U8, "LCDBuzzerTrigger"),
    reg(0x14E5, U8, "DRY1Trigger"),
    reg(0x14E6, U8, "DRY2Trigger"),
    reg(0x14E7, U8, "UARTMPTLVer"),
    reg(0x14E8, I32, "LCDBuzzerTriggerVal"),
    reg(0x14EC, I32, "LCDBuzzerReleaseVal"),
    reg(0x14F0, I32, "DRY1TriggerVal"),
    reg(0x14F4, I32, "DRY1ReleaseVal"),
    reg(0x14F8, I32, "DRY2TriggerVal"),
    reg(0x14FC, I32, "DRY2ReleaseVal"),
    reg(0x1500, I32, "DataStoredPeriod"),
    reg(0x1504, U8, "RCVTime"),
    reg(0x1505, U8, "RFVTime"),
    reg(0x1506, U8, "CANMPTLVer"),
];

/// Registers answered by a request for `group`, in catalog order.
pub fn registers_in(group: RegisterGroup) -> impl Iterator<Item = &'static RegisterDescriptor> {
    REGISTERS.iter().filter(move |r| group.contains(r.address))
}

/// Looks up a register by its display name.
pub fn find_register(name: &str) -> Option<&'static RegisterDescriptor> {
    REGISTERS.iter().find(|r| r.name == name)
}
