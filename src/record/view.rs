//! Tables and summaries shared by the home page and the downloadable report.

use maud::{Markup, html};

use crate::{
    endpoints::{self, with_id},
    html::{LINK_DELETE_STYLE, LINK_STYLE, TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE, format_idr},
    record::{core::FinancialRecord, filter::Totals},
};

pub fn totals_view(totals: &Totals) -> Markup {
    html! {
        dl class="grid grid-cols-1 sm:grid-cols-3 gap-4 w-full max-w-4xl my-4"
        {
            div class="p-4 rounded-lg bg-white dark:bg-gray-800 shadow"
            {
                dt class="text-sm text-gray-500 dark:text-gray-400" { "Total Pemasukan" }
                dd id="total-income" class="text-lg font-semibold text-green-600" {
                    "Rp " (format_idr(totals.income))
                }
            }

            div class="p-4 rounded-lg bg-white dark:bg-gray-800 shadow"
            {
                dt class="text-sm text-gray-500 dark:text-gray-400" { "Total Pengeluaran" }
                dd id="total-expense" class="text-lg font-semibold text-red-600" {
                    "Rp " (format_idr(totals.expense))
                }
            }

            div class="p-4 rounded-lg bg-white dark:bg-gray-800 shadow"
            {
                dt class="text-sm text-gray-500 dark:text-gray-400" { "Saldo" }
                dd id="balance" class="text-lg font-semibold" {
                    "Rp " (format_idr(totals.balance()))
                }
            }
        }
    }
}

/// A table of records, numbered from one.
///
/// `show_actions` adds edit and delete links to each row.
pub fn records_table(records: &[FinancialRecord], show_actions: bool) -> Markup {
    html! {
        div class="relative overflow-x-auto w-full max-w-4xl shadow-md rounded"
        {
            table class="w-full text-sm text-left text-gray-500 dark:text-gray-400"
            {
                thead class=(TABLE_HEADER_STYLE)
                {
                    tr
                    {
                        th scope="col" class=(TABLE_CELL_STYLE) { "No" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Tanggal" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Tipe" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Kategori" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Nominal" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Deskripsi" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Lampiran" }
                        @if show_actions {
                            th scope="col" class=(TABLE_CELL_STYLE) { "Aksi" }
                        }
                    }
                }

                tbody
                {
                    @for (index, record) in records.iter().enumerate() {
                        tr class=(TABLE_ROW_STYLE) data-record-id=(record.id)
                        {
                            td class=(TABLE_CELL_STYLE) { (index + 1) }
                            td class=(TABLE_CELL_STYLE) { (record.date) }
                            td class=(TABLE_CELL_STYLE) { (record.record_type.label()) }
                            td class=(TABLE_CELL_STYLE) { (record.category) }
                            td class=(TABLE_CELL_STYLE) { "Rp " (format_idr(record.nominal)) }
                            td class=(TABLE_CELL_STYLE) { (record.description.as_deref().unwrap_or("-")) }
                            td class=(TABLE_CELL_STYLE) { (record.attachment.as_deref().unwrap_or("-")) }
                            @if show_actions {
                                td class={ (TABLE_CELL_STYLE) " space-x-2" }
                                {
                                    a href=(with_id(endpoints::EDIT_RECORD, record.id)) class=(LINK_STYLE) { "Edit" }
                                    a href=(with_id(endpoints::DELETE_RECORD, record.id)) class=(LINK_DELETE_STYLE) { "Hapus" }
                                }
                            }
                        }
                    }

                    @if records.is_empty() {
                        tr class=(TABLE_ROW_STYLE)
                        {
                            td colspan=(if show_actions { 8 } else { 7 }) class={ (TABLE_CELL_STYLE) " text-center" }
                            {
                                "Belum ada data keuangan"
                            }
                        }
                    }
                }
            }
        }
    }
}
